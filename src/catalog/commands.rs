//! Provisioning command strings, dispatched by the model's format tag.

use serde::{Deserialize, Serialize};

use crate::{Channel, Codec};

use super::ModelSpec;

/// Wire format of a model's configuration commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommandFormat {
    /// `VIDEO,PARAM,1,<res>,<fps>,<bitrate>#` for the main camera only.
    VideoParam,
    /// `VIDEORSL,<pos>,<res>,<fps>,<bitrate>,<codec>#` per active channel.
    VideoRslCodec,
    /// `VIDEORSL,<num>,<res>,<fps>,<bitrate>#` with the number taken from the id.
    VideoRsl,
    /// `CAMERA,<id>,<preset>#` per channel with a preset.
    CameraPreset,
}

/// Formats provisioning commands for `channels` on `model`.
///
/// Fixed slots are reported as comment lines since they accept no command.
pub fn format_commands(model: &ModelSpec, channels: &[Channel]) -> Vec<String> {
    let configurable: Vec<(usize, &Channel)> = channels
        .iter()
        .enumerate()
        .filter(|(_, channel)| channel.active)
        .filter(|(_, channel)| !model.slot(&channel.id).is_some_and(|slot| slot.fixed))
        .collect();

    let mut lines: Vec<String> = match model.command_format {
        CommandFormat::VideoParam => configurable
            .first()
            .map(|(_, channel)| {
                format!(
                    "VIDEO,PARAM,1,{},{},{}#",
                    channel.resolution, channel.fps, channel.bitrate_mbps
                )
            })
            .into_iter()
            .collect(),
        CommandFormat::VideoRslCodec => configurable
            .iter()
            .map(|(position, channel)| {
                format!(
                    "VIDEORSL,{},{},{},{},{}#",
                    position + 1,
                    channel.resolution,
                    channel.fps,
                    channel.bitrate_mbps,
                    codec_value(channel.codec)
                )
            })
            .collect(),
        CommandFormat::VideoRsl => configurable
            .iter()
            .map(|(position, channel)| {
                format!(
                    "VIDEORSL,{},{},{},{}#",
                    channel_number(&channel.id).unwrap_or(position + 1),
                    channel.resolution,
                    channel.fps,
                    channel.bitrate_mbps
                )
            })
            .collect(),
        CommandFormat::CameraPreset => configurable
            .iter()
            .filter_map(|(_, channel)| {
                let preset = channel.preset?;
                Some(format!(
                    "CAMERA,{},{preset}# // {}P @ {}fps, {}Mbps",
                    channel.id, channel.resolution, channel.fps, channel.bitrate_mbps
                ))
            })
            .collect(),
    };

    for slot in model.channels.iter().filter(|slot| slot.fixed) {
        let setting = model.resolutions_for(slot).first().and_then(|option| {
            let bitrate = option.bitrates.first()?;
            let fps = model.fps_for(slot).first()?;
            Some(format!(": {}P @ {bitrate}M @ {fps}fps", option.value))
        });
        lines.push(format!(
            "# {} ({}) is fixed{}",
            slot.id,
            slot.name,
            setting.unwrap_or_default()
        ));
    }
    lines
}

fn codec_value(codec: Codec) -> u8 {
    match codec {
        Codec::H264 => 1,
        Codec::H265 => 2,
    }
}

/// Digits embedded in a channel id, e.g. `CH4` -> 4.
fn channel_number(id: &str) -> Option<usize> {
    let digits: String = id.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}
