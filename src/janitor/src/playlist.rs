//! Playlist parser module.
//!
//! Adapter around the `m3u8-rs` crate reducing a parsed playlist to the
//! three attributes the staleness check looks at.

use m3u8_rs::Playlist as M3u8Playlist;

use crate::error::PlaylistError;

/// How a playlist is treated by the staleness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaylistKind {
    /// Multi-rendition index pointing at media playlists.
    Variant,
    /// Media playlist terminated by `#EXT-X-ENDLIST`.
    Ended,
    /// Media playlist of a stream that is still being published.
    Live,
}

/// Parsed playlist.
#[derive(Debug, Clone, PartialEq)]
pub struct Playlist {
    target_duration: f64,
    is_variant: bool,
    has_end_tag: bool,
}

impl Playlist {
    /// Parse M3U8 content.
    pub fn parse(data: &[u8]) -> Result<Self, PlaylistError> {
        let input = std::str::from_utf8(data)?;
        if !input.trim_start().starts_with("#EXTM3U") {
            return Err(PlaylistError::Invalid("missing #EXTM3U header".to_string()));
        }

        let parsed = m3u8_rs::parse_playlist_res(input.as_bytes())
            .map_err(|_| PlaylistError::Invalid("malformed playlist tags".to_string()))?;

        let playlist = match parsed {
            M3u8Playlist::MasterPlaylist(_) => Self {
                target_duration: 0.0,
                is_variant: true,
                has_end_tag: false,
            },
            M3u8Playlist::MediaPlaylist(media) => Self {
                target_duration: media.target_duration as f64,
                is_variant: false,
                has_end_tag: media.end_list,
            },
        };

        Ok(playlist)
    }

    /// Variant wins over the end tag, which wins over live.
    pub fn kind(&self) -> PlaylistKind {
        if self.is_variant {
            PlaylistKind::Variant
        } else if self.has_end_tag {
            PlaylistKind::Ended
        } else {
            PlaylistKind::Live
        }
    }

    /// Target duration of a live playlist, rejecting playlists without one.
    pub fn live_target_duration(&self) -> Result<f64, PlaylistError> {
        if !self.target_duration.is_finite() || self.target_duration <= 0.0 {
            return Err(PlaylistError::MissingTargetDuration);
        }
        Ok(self.target_duration)
    }
}
