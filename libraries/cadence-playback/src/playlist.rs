//! Shared playlist with a cursor
//!
//! ```text
//!   [ A ] [ B ] [ C ] [ D ]
//!           ^
//!        At(1): B is current, next is C
//!
//!   remove B while it plays:
//!   [ A ] [ C ] [ D ]
//!           ^
//!        Detached(1): B keeps playing, next is C
//! ```
//!
//! Every operation takes one short lock; the engine thread and callers see a
//! linearizable sequence of mutations and cursor moves.

use crate::error::{PlaybackError, Result};
use crate::track::Track;
use crate::types::EndOfPlaylist;
use parking_lot::Mutex;
use std::sync::Arc;

/// Cursor into the playlist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cursor {
    /// Nothing selected
    #[default]
    None,
    /// Track at this index is current
    At(usize),
    /// Current track was removed; the next advance lands on this index
    Detached(usize),
}

#[derive(Debug, Default)]
struct PlaylistInner {
    tracks: Vec<Track>,
    cursor: Cursor,
}

impl PlaylistInner {
    fn next_index(&self, policy: EndOfPlaylist) -> Option<usize> {
        let len = self.tracks.len();
        let candidate = match self.cursor {
            Cursor::None => 0,
            Cursor::At(i) => i + 1,
            Cursor::Detached(i) => i,
        };
        if candidate < len {
            Some(candidate)
        } else if policy == EndOfPlaylist::Loop && len > 0 {
            Some(0)
        } else {
            None
        }
    }

    fn previous_index(&self, policy: EndOfPlaylist) -> Option<usize> {
        let len = self.tracks.len();
        let current = match self.cursor {
            Cursor::None => return None,
            Cursor::At(i) | Cursor::Detached(i) => i,
        };
        if current > 0 && current - 1 < len {
            Some(current - 1)
        } else if policy == EndOfPlaylist::Loop && len > 0 {
            Some(len - 1)
        } else {
            None
        }
    }

    fn remove_at(&mut self, index: usize) -> Track {
        let track = self.tracks.remove(index);
        self.cursor = match self.cursor {
            Cursor::At(c) if index < c => Cursor::At(c - 1),
            Cursor::At(c) if index == c => Cursor::Detached(c),
            Cursor::Detached(c) if index < c => Cursor::Detached(c - 1),
            other => other,
        };
        track
    }

    fn insert(&mut self, index: usize, track: Track) {
        self.tracks.insert(index, track);
        self.cursor = match self.cursor {
            Cursor::At(c) if index <= c => Cursor::At(c + 1),
            Cursor::Detached(c) if index < c => Cursor::Detached(c + 1),
            other => other,
        };
    }
}

/// Thread-safe ordered track list
///
/// Clones share the same list. The engine holds one handle and swaps it
/// wholesale on `set_playlist`.
#[derive(Debug, Clone, Default)]
pub struct Playlist {
    inner: Arc<Mutex<PlaylistInner>>,
}

impl Playlist {
    /// Create new empty playlist
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tracks(tracks: Vec<Track>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(PlaylistInner {
                tracks,
                cursor: Cursor::None,
            })),
        }
    }

    // ===== Queries =====

    pub fn len(&self) -> usize {
        self.inner.lock().tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().tracks.is_empty()
    }

    /// Snapshot of the tracks in order
    pub fn tracks(&self) -> Vec<Track> {
        self.inner.lock().tracks.clone()
    }

    pub fn get(&self, index: usize) -> Option<Track> {
        self.inner.lock().tracks.get(index).cloned()
    }

    pub fn contains(&self, track: &Track) -> bool {
        self.inner.lock().tracks.contains(track)
    }

    pub fn position_of(&self, track: &Track) -> Option<usize> {
        self.inner.lock().tracks.iter().position(|t| t == track)
    }

    pub fn cursor(&self) -> Cursor {
        self.inner.lock().cursor
    }

    /// Track under the cursor (`None` when nothing selected or detached)
    pub fn current(&self) -> Option<Track> {
        let inner = self.inner.lock();
        match inner.cursor {
            Cursor::At(i) => inner.tracks.get(i).cloned(),
            _ => None,
        }
    }

    /// Index an advance would land on
    pub fn next_index(&self, policy: EndOfPlaylist) -> Option<usize> {
        self.inner.lock().next_index(policy)
    }

    /// Index a retreat would land on
    pub fn previous_index(&self, policy: EndOfPlaylist) -> Option<usize> {
        self.inner.lock().previous_index(policy)
    }

    // ===== Mutation =====

    /// Append to the end
    pub fn add_track(&self, track: Track) {
        self.inner.lock().tracks.push(track);
    }

    /// Append unless already present; returns the track's index
    pub fn add_if_absent(&self, track: &Track) -> usize {
        let mut inner = self.inner.lock();
        if let Some(index) = inner.tracks.iter().position(|t| t == track) {
            return index;
        }
        inner.tracks.push(track.clone());
        inner.tracks.len() - 1
    }

    /// Insert at `index` (may equal `len()`)
    pub fn insert(&self, index: usize, track: Track) -> Result<()> {
        let mut inner = self.inner.lock();
        if index > inner.tracks.len() {
            return Err(PlaybackError::TrackNotFound(format!("index {}", index)));
        }
        inner.insert(index, track);
        Ok(())
    }

    /// Remove by identity
    pub fn remove_track(&self, track: &Track) -> Result<Track> {
        let mut inner = self.inner.lock();
        let index = inner
            .tracks
            .iter()
            .position(|t| t == track)
            .ok_or_else(|| PlaybackError::TrackNotFound(track.name().to_string()))?;
        Ok(inner.remove_at(index))
    }

    /// Remove by position
    pub fn remove_at(&self, index: usize) -> Result<Track> {
        let mut inner = self.inner.lock();
        if index >= inner.tracks.len() {
            return Err(PlaybackError::TrackNotFound(format!("index {}", index)));
        }
        Ok(inner.remove_at(index))
    }

    /// Remove everything and drop the cursor
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.tracks.clear();
        inner.cursor = Cursor::None;
    }

    /// Move a track; the cursor follows the current track
    pub fn move_track(&self, from: usize, to: usize) -> Result<()> {
        let mut inner = self.inner.lock();
        let len = inner.tracks.len();
        if from >= len || to >= len {
            return Err(PlaybackError::TrackNotFound(format!(
                "move {} -> {} in playlist of {}",
                from, to, len
            )));
        }
        if from == to {
            return Ok(());
        }

        let moving_current = inner.cursor == Cursor::At(from);
        let track = inner.remove_at(from);
        inner.insert(to, track);
        if moving_current {
            inner.cursor = Cursor::At(to);
        }
        Ok(())
    }

    // ===== Cursor =====

    /// Point the cursor at `index`
    pub fn select(&self, index: usize) -> Result<Track> {
        let mut inner = self.inner.lock();
        let track = inner
            .tracks
            .get(index)
            .cloned()
            .ok_or(PlaybackError::NoMoreTracks)?;
        inner.cursor = Cursor::At(index);
        Ok(track)
    }

    /// Move to the next track; `None` at the end (cursor left in place)
    pub fn advance(&self, policy: EndOfPlaylist) -> Option<Track> {
        let mut inner = self.inner.lock();
        let index = inner.next_index(policy)?;
        inner.cursor = Cursor::At(index);
        inner.tracks.get(index).cloned()
    }

    /// Move to the previous track; `None` at the start
    pub fn retreat(&self, policy: EndOfPlaylist) -> Option<Track> {
        let mut inner = self.inner.lock();
        let index = inner.previous_index(policy)?;
        inner.cursor = Cursor::At(index);
        inner.tracks.get(index).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::testing::RampSource;
    use crate::source::Reusability;
    use crate::track::TrackMetadata;
    use cadence_audio::PcmFormat;

    fn track(name: &str) -> Track {
        Track::new(
            TrackMetadata::new(name),
            RampSource::new(PcmFormat::new(8_000, 1), 80, Reusability::Reusable),
        )
    }

    fn playlist(n: usize) -> (Playlist, Vec<Track>) {
        let tracks: Vec<Track> = (0..n).map(|i| track(&format!("T{}", i))).collect();
        (Playlist::from_tracks(tracks.clone()), tracks)
    }

    #[test]
    fn test_advance_to_end() {
        let (list, tracks) = playlist(3);
        assert_eq!(list.advance(EndOfPlaylist::Stop), Some(tracks[0].clone()));
        assert_eq!(list.advance(EndOfPlaylist::Stop), Some(tracks[1].clone()));
        assert_eq!(list.advance(EndOfPlaylist::Stop), Some(tracks[2].clone()));
        assert_eq!(list.advance(EndOfPlaylist::Stop), None);
        assert_eq!(list.cursor(), Cursor::At(2));
    }

    #[test]
    fn test_loop_wraps_both_ways() {
        let (list, tracks) = playlist(2);
        list.select(1).unwrap();
        assert_eq!(list.advance(EndOfPlaylist::Loop), Some(tracks[0].clone()));
        assert_eq!(list.retreat(EndOfPlaylist::Loop), Some(tracks[1].clone()));
    }

    #[test]
    fn test_retreat_at_start() {
        let (list, _) = playlist(2);
        list.select(0).unwrap();
        assert_eq!(list.previous_index(EndOfPlaylist::Stop), None);
        assert_eq!(list.retreat(EndOfPlaylist::Stop), None);
        assert_eq!(list.cursor(), Cursor::At(0));
    }

    #[test]
    fn test_remove_current_detaches() {
        let (list, tracks) = playlist(3);
        list.select(1).unwrap();

        list.remove_track(&tracks[1]).unwrap();
        assert_eq!(list.cursor(), Cursor::Detached(1));
        assert_eq!(list.current(), None);
        assert_eq!(list.advance(EndOfPlaylist::Stop), Some(tracks[2].clone()));
    }

    #[test]
    fn test_remove_before_cursor_shifts() {
        let (list, tracks) = playlist(3);
        list.select(2).unwrap();
        list.remove_at(0).unwrap();
        assert_eq!(list.current(), Some(tracks[2].clone()));
        assert_eq!(list.cursor(), Cursor::At(1));
    }

    #[test]
    fn test_insert_before_cursor_shifts() {
        let (list, tracks) = playlist(2);
        list.select(0).unwrap();
        list.insert(0, track("new")).unwrap();
        assert_eq!(list.current(), Some(tracks[0].clone()));
        assert!(list.insert(10, track("bad")).is_err());
    }

    #[test]
    fn test_move_keeps_current() {
        let (list, tracks) = playlist(4);
        list.select(1).unwrap();

        list.move_track(1, 3).unwrap();
        assert_eq!(list.current(), Some(tracks[1].clone()));
        assert_eq!(list.cursor(), Cursor::At(3));

        list.move_track(0, 3).unwrap();
        assert_eq!(list.current(), Some(tracks[1].clone()));
        assert_eq!(list.cursor(), Cursor::At(2));
    }

    #[test]
    fn test_clear_resets_cursor() {
        let (list, _) = playlist(3);
        list.select(2).unwrap();
        list.clear();
        assert!(list.is_empty());
        assert_eq!(list.cursor(), Cursor::None);
        assert_eq!(list.advance(EndOfPlaylist::Loop), None);
    }

    #[test]
    fn test_remove_missing_track() {
        let (list, _) = playlist(1);
        assert!(matches!(
            list.remove_track(&track("other")),
            Err(PlaybackError::TrackNotFound(_))
        ));
        assert!(list.remove_at(5).is_err());
    }

    #[test]
    fn test_add_if_absent() {
        let (list, tracks) = playlist(2);
        assert_eq!(list.add_if_absent(&tracks[1]), 1);
        let extra = track("extra");
        assert_eq!(list.add_if_absent(&extra), 2);
        assert!(list.contains(&extra));
        assert_eq!(list.position_of(&extra), Some(2));
    }

    #[test]
    fn test_clones_share_state() {
        let (list, _) = playlist(1);
        let other = list.clone();
        other.add_track(track("shared"));
        assert_eq!(list.len(), 2);
    }
}
