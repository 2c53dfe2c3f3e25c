use battleship_client::protocol::{Dispatcher, FrameDecoder, MessageType};
use proptest::prelude::*;

const LINES: &[&str] = &[
    "ACK",
    "TURN_SET|YOU",
    "TURN_SET|OPPONENT",
    "OPPONENT_TURN|23|HIT",
    "OPPONENT_TURN|7|MISS",
    "INVALIDATE_FIELD|OPPONENT|45",
    "GAME_END|YOU",
    "OPPONENT_NICKNAME_SET|Bob",
    "KEEP_ALIVE",
    "GARBAGE|1|2",
    "",
    "ROOM_CREATED|7421\r",
];

fn recorder() -> Dispatcher<String> {
    let mut d = Dispatcher::new();
    for &kind in MessageType::ALL {
        d.on(kind, move |params| Ok(format!("{}|{}", kind, params.join("|"))));
    }
    d
}

const CAP: usize = 32;

fn capped_recorder() -> Dispatcher<String> {
    let mut d = Dispatcher::with_decoder(FrameDecoder::with_max_line(CAP));
    for &kind in MessageType::ALL {
        d.on(kind, move |params| Ok(format!("{}|{}", kind, params.join("|"))));
    }
    d
}

/// Feed `chunks` until the first overflow, as a connection would.
fn feed_chunks<'a>(
    d: &mut Dispatcher<String>,
    chunks: impl IntoIterator<Item = &'a [u8]>,
) -> (Vec<String>, bool) {
    let mut out = Vec::new();
    for chunk in chunks {
        if d.feed_into(chunk, &mut out).is_err() {
            return (out, true);
        }
    }
    (out, false)
}

fn stream(indices: &[usize]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for &i in indices {
        bytes.extend_from_slice(LINES[i].as_bytes());
        bytes.push(b'\n');
    }
    bytes
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn chunk_boundaries_do_not_matter(
        indices in proptest::collection::vec(0..LINES.len(), 0..24),
        cuts in proptest::collection::vec(any::<usize>(), 0..16),
    ) {
        let bytes = stream(&indices);
        let whole = recorder().feed(&bytes).unwrap();

        let mut positions: Vec<usize> = cuts
            .iter()
            .map(|c| if bytes.is_empty() { 0 } else { c % bytes.len() })
            .collect();
        positions.sort_unstable();
        positions.dedup();

        let mut chunked = recorder();
        let mut out = Vec::new();
        let mut start = 0;
        for pos in positions.into_iter().chain(std::iter::once(bytes.len())) {
            out.extend(chunked.feed(&bytes[start..pos]).unwrap());
            start = pos;
        }
        prop_assert_eq!(out, whole);
    }

    #[test]
    fn byte_at_a_time_matches_whole(indices in proptest::collection::vec(0..LINES.len(), 1..12)) {
        let bytes = stream(&indices);
        let whole = recorder().feed(&bytes).unwrap();
        let mut d = recorder();
        let mut out = Vec::new();
        for b in &bytes {
            out.extend(d.feed(std::slice::from_ref(b)).unwrap());
        }
        prop_assert_eq!(out, whole);
    }

    #[test]
    fn overlong_line_is_chunking_independent(
        indices in proptest::collection::vec(0..LINES.len(), 0..16),
        at in any::<usize>(),
        extra in 1..64usize,
        chunk in 1..100usize,
    ) {
        let mut bytes = stream(&indices);
        let at = if indices.is_empty() { 0 } else { stream(&indices[..at % indices.len()]).len() };
        let mut long = b"OPPONENT_NICKNAME_SET|".to_vec();
        long.resize(CAP + extra, b'x');
        long.push(b'\n');
        bytes.splice(at..at, long);

        let whole = feed_chunks(&mut capped_recorder(), [&bytes[..]]);
        let chunked = feed_chunks(&mut capped_recorder(), bytes.chunks(chunk));
        prop_assert!(whole.1);
        prop_assert_eq!(&chunked, &whole);
        let before = feed_chunks(&mut capped_recorder(), [&bytes[..at]]);
        prop_assert_eq!(chunked.0, before.0);
    }

    #[test]
    fn one_shot_is_absent_after_firing(indices in proptest::collection::vec(0..LINES.len(), 0..24)) {
        let mut d = recorder();
        d.once(MessageType::TurnSet, |_| Ok("once".to_string())).unwrap();
        let out = d.feed(&stream(&indices)).unwrap();
        let fired = out.iter().filter(|s| s.as_str() == "once").count();
        let turn_sets = indices.iter().filter(|&&i| LINES[i].starts_with("TURN_SET")).count();
        prop_assert_eq!(fired, turn_sets.min(1));
        prop_assert_eq!(d.is_awaiting(MessageType::TurnSet), turn_sets == 0);
    }
}
