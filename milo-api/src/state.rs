//! Typed state snapshots for the device.
//!
//! Both the REST poll responses and the WebSocket push events decode into
//! these types. A snapshot always replaces the previous one entirely.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Audio sources the device can play from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AudioSource {
    /// Spotify Connect via librespot
    Librespot,
    /// Bluetooth A2DP sink
    Bluetooth,
    /// roc-toolkit network audio receiver
    Roc,
    /// No source active (also covers unrecognized source ids)
    #[default]
    #[serde(other)]
    None,
}

impl AudioSource {
    /// Wire identifier used in API paths, e.g. `POST /api/audio/source/{id}`.
    pub fn id(&self) -> &'static str {
        match self {
            AudioSource::Librespot => "librespot",
            AudioSource::Bluetooth => "bluetooth",
            AudioSource::Roc => "roc",
            AudioSource::None => "none",
        }
    }
}

/// Complete device state snapshot.
///
/// Decoded from `GET /api/audio/state` responses and from the `full_state`
/// payload of WebSocket system events. Missing fields fall back to defaults
/// so partial server payloads still decode.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
pub struct DeviceState {
    /// Currently active audio source
    #[serde(default)]
    pub active_source: AudioSource,
    /// Source being transitioned to, if a switch is in progress
    #[serde(default)]
    pub target_source: Option<AudioSource>,
    /// Whether multiroom routing is enabled
    #[serde(default)]
    pub multiroom_enabled: bool,
    /// Whether the equalizer is enabled
    #[serde(default)]
    pub equalizer_enabled: bool,
    /// Free-form plugin state reported by the device
    #[serde(default)]
    pub plugin_state: String,
    /// Track metadata (title, artist, ...) as reported by the active source
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Volume state snapshot.
///
/// Decoded from `GET /api/volume/status` responses and from `volume_changed`
/// WebSocket events.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
pub struct VolumeState {
    /// Volume level, clamped to 0..=100 on decode
    #[serde(default, deserialize_with = "clamp_volume")]
    pub volume: u8,
    /// Volume mode reported by the device (e.g. "normal", "fixed")
    #[serde(default)]
    pub mode: String,
    /// Whether multiroom routing is enabled
    #[serde(default)]
    pub multiroom_enabled: bool,
}

fn clamp_volume<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = i64::deserialize(deserializer)?;
    Ok(raw.clamp(0, 100) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_source_decodes_lowercase_ids() {
        let source: AudioSource = serde_json::from_str("\"librespot\"").unwrap();
        assert_eq!(source, AudioSource::Librespot);

        let source: AudioSource = serde_json::from_str("\"bluetooth\"").unwrap();
        assert_eq!(source, AudioSource::Bluetooth);

        let source: AudioSource = serde_json::from_str("\"roc\"").unwrap();
        assert_eq!(source, AudioSource::Roc);

        let source: AudioSource = serde_json::from_str("\"none\"").unwrap();
        assert_eq!(source, AudioSource::None);
    }

    #[test]
    fn unknown_source_decodes_as_none() {
        let source: AudioSource = serde_json::from_str("\"airplay\"").unwrap();
        assert_eq!(source, AudioSource::None);
    }

    #[test]
    fn device_state_decodes_full_payload() {
        let json = r#"{
            "active_source": "librespot",
            "target_source": "bluetooth",
            "multiroom_enabled": true,
            "equalizer_enabled": false,
            "plugin_state": "playing",
            "metadata": {"title": "Song", "artist": "Band"}
        }"#;

        let state: DeviceState = serde_json::from_str(json).unwrap();
        assert_eq!(state.active_source, AudioSource::Librespot);
        assert_eq!(state.target_source, Some(AudioSource::Bluetooth));
        assert!(state.multiroom_enabled);
        assert!(!state.equalizer_enabled);
        assert_eq!(state.plugin_state, "playing");
        assert_eq!(state.metadata.get("title").map(String::as_str), Some("Song"));
    }

    #[test]
    fn device_state_missing_fields_use_defaults() {
        let state: DeviceState = serde_json::from_str("{}").unwrap();
        assert_eq!(state.active_source, AudioSource::None);
        assert_eq!(state.target_source, None);
        assert!(!state.multiroom_enabled);
        assert!(!state.equalizer_enabled);
        assert!(state.plugin_state.is_empty());
        assert!(state.metadata.is_empty());
    }

    #[test]
    fn target_source_does_not_disturb_active_source() {
        // A transition payload carries the last known active source alongside
        // the new target; decoding must keep both.
        let json = r#"{"active_source": "librespot", "target_source": "bluetooth"}"#;
        let state: DeviceState = serde_json::from_str(json).unwrap();
        assert_eq!(state.active_source, AudioSource::Librespot);
        assert_eq!(state.target_source, Some(AudioSource::Bluetooth));
    }

    #[test]
    fn volume_state_decodes_exact_fields() {
        let json = r#"{"volume": 42, "mode": "normal", "multiroom_enabled": true}"#;
        let state: VolumeState = serde_json::from_str(json).unwrap();
        assert_eq!(state.volume, 42);
        assert_eq!(state.mode, "normal");
        assert!(state.multiroom_enabled);
    }

    #[test]
    fn volume_is_clamped_on_decode() {
        let state: VolumeState = serde_json::from_str(r#"{"volume": 150}"#).unwrap();
        assert_eq!(state.volume, 100);

        let state: VolumeState = serde_json::from_str(r#"{"volume": -3}"#).unwrap();
        assert_eq!(state.volume, 0);
    }
}
