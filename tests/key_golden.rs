mod fixture;

use tape_vt::core::key::{KEY_F01, KEY_TAB};
use pretty_assertions::assert_eq;
use tape_vt::{
    Decoder, Dialect, Event, Inbound, Key, Modifiers, Mouse, MouseButton, MouseEventType,
    Tokenizer,
};

fn decode_all(dialect: Dialect, input: &[u8]) -> Vec<Inbound> {
    let mut tokenizer = Tokenizer::default();
    let mut decoder = Decoder::with_dialect(dialect);
    let mut tokens = tokenizer.process(input);
    tokens.extend(tokenizer.flush());
    tokens
        .into_iter()
        .flat_map(|token| decoder.decode(token))
        .collect()
}

fn decode_keys(dialect: Dialect, input: &[u8]) -> Vec<Key> {
    decode_all(dialect, input)
        .into_iter()
        .filter_map(|item| match item {
            Inbound::Event(Event::Key(key)) => Some(key),
            _ => None,
        })
        .collect()
}

#[test]
fn key_vectors_match_fixture() {
    for (line_num, columns) in fixture::read_rows("key_vectors.tsv") {
        assert_eq!(
            columns.len(),
            3,
            "line {line_num}: expected 3 columns, got {}",
            columns.len()
        );
        let dialect = match columns[0].as_str() {
            "legacy" => Dialect::Legacy,
            "kitty" => Dialect::Kitty,
            other => panic!("line {line_num}: unknown dialect {other}"),
        };
        let input: Vec<u8> = columns[1].chars().map(|ch| ch as u8).collect();
        let keys = decode_keys(dialect, &input);
        assert_eq!(
            keys.len(),
            1,
            "line {line_num}: expected one key for {:?}, got {keys:?}",
            columns[1]
        );
        assert_eq!(
            keys[0].describe(),
            columns[2],
            "line {line_num}: describe mismatch for {:?}",
            columns[1]
        );
    }
}

#[test]
fn describe_prefix_order() {
    assert_eq!(
        Key::new('a' as u32)
            .with_modifiers(Modifiers::ALT)
            .describe(),
        "Alt+a"
    );
    assert_eq!(Key::new(0x01).describe(), "Ctrl+a");
    assert_eq!(
        Key::new(KEY_F01)
            .with_modifiers(Modifiers::SHIFT)
            .describe(),
        "Shift+F1"
    );
    let all = Modifiers::SHIFT
        | Modifiers::ALT
        | Modifiers::CTRL
        | Modifiers::SUPER
        | Modifiers::HYPER
        | Modifiers::META;
    assert_eq!(
        Key::new('x' as u32).with_modifiers(all).describe(),
        "Meta+Hyper+Super+Ctrl+Alt+Shift+x"
    );
}

#[test]
fn matches_ignores_lock_modifiers() {
    let key = Key::new(KEY_TAB).with_modifiers(Modifiers::SHIFT | Modifiers::CAPS_LOCK | Modifiers::NUM_LOCK);
    assert!(key.matches(KEY_TAB, Modifiers::SHIFT));
    assert!(!key.matches(KEY_TAB, Modifiers::empty()));
}

#[test]
fn sgr_mouse_is_zero_indexed() {
    assert_eq!(
        decode_all(Dialect::Legacy, b"\x1b[<0;10;5M"),
        vec![Inbound::Event(Event::Mouse(Mouse {
            button: MouseButton::Left,
            event_type: MouseEventType::Press,
            col: 9,
            row: 4,
            modifiers: Modifiers::empty(),
        }))]
    );
}
