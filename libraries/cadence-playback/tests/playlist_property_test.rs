//! Property-based tests for playlist cursor invariants
//!
//! Arbitrary interleavings of mutations and cursor moves must keep the
//! cursor pointing inside the list, and must never silently swap the
//! current track for another one.


use cadence_playback::{Cursor, EndOfPlaylist, Playlist, Track};
use proptest::prelude::*;
use std::time::Duration;
use test_helpers::ramp_track;

#[derive(Debug, Clone)]
enum Op {
    Add,
    Insert(usize),
    RemoveAt(usize),
    Move(usize, usize),
    Select(usize),
    Advance(bool),
    Retreat(bool),
    Clear,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => Just(Op::Add),
        2 => (0usize..12).prop_map(Op::Insert),
        2 => (0usize..12).prop_map(Op::RemoveAt),
        2 => (0usize..12, 0usize..12).prop_map(|(a, b)| Op::Move(a, b)),
        2 => (0usize..12).prop_map(Op::Select),
        3 => any::<bool>().prop_map(Op::Advance),
        2 => any::<bool>().prop_map(Op::Retreat),
        1 => Just(Op::Clear),
    ]
}

fn policy(looping: bool) -> EndOfPlaylist {
    if looping {
        EndOfPlaylist::Loop
    } else {
        EndOfPlaylist::Stop
    }
}

fn cursor_in_bounds(playlist: &Playlist) -> bool {
    match playlist.cursor() {
        Cursor::None => true,
        Cursor::At(i) => i < playlist.len(),
        Cursor::Detached(i) => i <= playlist.len(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_cursor_stays_valid(ops in prop::collection::vec(op(), 1..60)) {
        let playlist = Playlist::new();
        let mut counter = 0;
        let mut fresh = || {
            counter += 1;
            ramp_track(&format!("T{}", counter), Duration::from_millis(10))
        };

        for op in ops {
            // Which track is current before the operation
            let before: Option<Track> = playlist.current();

            match op.clone() {
                Op::Add => playlist.add_track(fresh()),
                Op::Insert(i) => { let _ = playlist.insert(i, fresh()); }
                Op::RemoveAt(i) => { let _ = playlist.remove_at(i); }
                Op::Move(a, b) => { let _ = playlist.move_track(a, b); }
                Op::Select(i) => { let _ = playlist.select(i); }
                Op::Advance(looping) => { playlist.advance(policy(looping)); }
                Op::Retreat(looping) => { playlist.retreat(policy(looping)); }
                Op::Clear => playlist.clear(),
            }

            prop_assert!(
                cursor_in_bounds(&playlist),
                "cursor {:?} len {}",
                playlist.cursor(),
                playlist.len()
            );

            // Mutations that keep the current track keep it current
            if let (Some(before), Op::Add | Op::Insert(_) | Op::Move(..)) = (&before, &op) {
                let current = playlist.current();
                prop_assert_eq!(current.as_ref(), Some(before));
            }
        }
    }

    #[test]
    fn prop_stop_policy_visits_each_track_once(len in 1usize..10) {
        let tracks: Vec<Track> = (0..len)
            .map(|i| ramp_track(&format!("T{}", i), Duration::from_millis(10)))
            .collect();
        let playlist = Playlist::from_tracks(tracks.clone());

        let mut visited = Vec::new();
        while let Some(track) = playlist.advance(EndOfPlaylist::Stop) {
            visited.push(track);
            prop_assert!(visited.len() <= len);
        }
        prop_assert_eq!(visited, tracks);
        prop_assert_eq!(playlist.next_index(EndOfPlaylist::Stop), None);
        prop_assert_eq!(playlist.next_index(EndOfPlaylist::Loop), Some(0));
    }

    #[test]
    fn prop_removing_current_lands_on_successor(len in 2usize..10, pick in 0usize..10) {
        let pick = pick % len;
        let tracks: Vec<Track> = (0..len)
            .map(|i| ramp_track(&format!("T{}", i), Duration::from_millis(10)))
            .collect();
        let playlist = Playlist::from_tracks(tracks.clone());

        playlist.select(pick).unwrap();
        playlist.remove_at(pick).unwrap();
        prop_assert!(playlist.current().is_none());

        let next = playlist.advance(EndOfPlaylist::Stop);
        prop_assert_eq!(next, tracks.get(pick + 1).cloned());
    }
}
