use proptest::prelude::*;
use tape_vt::{Decoder, Dialect, Inbound, Tokenizer};

fn decode_chunks(dialect: Dialect, chunks: &[&[u8]]) -> Vec<Inbound> {
    let mut tokenizer = Tokenizer::default();
    let mut decoder = Decoder::with_dialect(dialect);
    let mut tokens = Vec::new();
    for chunk in chunks {
        tokens.extend(tokenizer.process(chunk));
    }
    tokens.extend(tokenizer.flush());
    tokens
        .into_iter()
        .flat_map(|token| decoder.decode(token))
        .collect()
}

/// Bytes biased towards escape sequence structure.
fn input_bytes() -> impl Strategy<Value = Vec<u8>> {
    let byte = prop_oneof![
        3 => any::<u8>(),
        2 => Just(0x1b_u8),
        2 => prop::sample::select(b"[]P_O;:<?~\\uMmt0123456789".to_vec()),
        1 => prop::sample::select(vec![0x07_u8, 0x0d, 0x7f, 0xc3, 0xa9, 0xe6, 0xbc, 0xa2]),
    ];
    prop::collection::vec(byte, 0..64)
}

fn dialect() -> impl Strategy<Value = Dialect> {
    prop_oneof![Just(Dialect::Legacy), Just(Dialect::Kitty)]
}

proptest! {
    #[test]
    fn split_reads_decode_like_one_read(
        bytes in input_bytes(),
        split in any::<prop::sample::Index>(),
        dialect in dialect(),
    ) {
        let at = split.index(bytes.len() + 1);
        let (head, tail) = bytes.split_at(at);
        let whole = decode_chunks(dialect, &[&bytes]);
        let split = decode_chunks(dialect, &[head, tail]);
        prop_assert_eq!(split, whole);
    }

    #[test]
    fn byte_at_a_time_decodes_like_one_read(bytes in input_bytes(), dialect in dialect()) {
        let chunks: Vec<&[u8]> = bytes.chunks(1).collect();
        prop_assert_eq!(decode_chunks(dialect, &chunks), decode_chunks(dialect, &[&bytes]));
    }

    #[test]
    fn arbitrary_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let _ = decode_chunks(Dialect::Legacy, &[&bytes]);
        let _ = decode_chunks(Dialect::Kitty, &[&bytes]);
    }
}
