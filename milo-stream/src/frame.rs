//! Inbound frame parsing.
//!
//! The device pushes JSON frames of the shape
//! `{ "category": ..., "type": ..., "data": {...} }`. System and plugin
//! frames carry a complete state snapshot under `data.full_state`; volume
//! frames carry the volume fields directly in `data`. Unknown or malformed
//! frames are a parse error that the session logs and skips; they never tear
//! down the socket.

use milo_api::{DeviceState, VolumeState};
use serde::Deserialize;

/// Frame category as sent by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Category {
    System,
    Volume,
    Plugin,
}

/// Frame type as sent by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum FrameKind {
    StateChanged,
    TransitionStart,
    TransitionComplete,
    VolumeChanged,
}

#[derive(Debug, Deserialize)]
struct WireFrame {
    category: Category,
    #[serde(rename = "type")]
    kind: FrameKind,
    #[serde(default)]
    data: serde_json::Value,
}

/// A typed push event decoded from an inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    /// A complete device state snapshot
    State(DeviceState),
    /// A volume snapshot
    Volume(VolumeState),
}

/// Errors from frame parsing.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The frame was not valid JSON or did not match the envelope shape
    #[error("Invalid frame: {0}")]
    Json(String),

    /// The frame was missing its expected payload
    #[error("Frame missing payload: {0}")]
    MissingPayload(&'static str),

    /// The category/type combination is not one the device sends
    #[error("Unexpected frame: category {category}, type {kind}")]
    Unexpected {
        category: &'static str,
        kind: &'static str,
    },
}

/// Parse an inbound text frame into a typed push event.
pub fn parse_frame(text: &str) -> Result<PushEvent, FrameError> {
    let frame: WireFrame =
        serde_json::from_str(text).map_err(|e| FrameError::Json(e.to_string()))?;

    match (frame.category, frame.kind) {
        // System and plugin frames all carry a full snapshot; transition
        // frames differ only in what the server put into target_source.
        (
            Category::System | Category::Plugin,
            FrameKind::StateChanged | FrameKind::TransitionStart | FrameKind::TransitionComplete,
        ) => {
            let full_state = frame
                .data
                .get("full_state")
                .ok_or(FrameError::MissingPayload("full_state"))?;
            let state: DeviceState = serde_json::from_value(full_state.clone())
                .map_err(|e| FrameError::Json(e.to_string()))?;
            Ok(PushEvent::State(state))
        }
        (Category::Volume, FrameKind::VolumeChanged) => {
            let volume: VolumeState = serde_json::from_value(frame.data)
                .map_err(|e| FrameError::Json(e.to_string()))?;
            Ok(PushEvent::Volume(volume))
        }
        (category, kind) => Err(FrameError::Unexpected {
            category: category_name(category),
            kind: kind_name(kind),
        }),
    }
}

fn category_name(category: Category) -> &'static str {
    match category {
        Category::System => "system",
        Category::Volume => "volume",
        Category::Plugin => "plugin",
    }
}

fn kind_name(kind: FrameKind) -> &'static str {
    match kind {
        FrameKind::StateChanged => "state_changed",
        FrameKind::TransitionStart => "transition_start",
        FrameKind::TransitionComplete => "transition_complete",
        FrameKind::VolumeChanged => "volume_changed",
    }
}
