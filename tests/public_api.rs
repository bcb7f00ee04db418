#![allow(unused_imports)]

use tape_vt::{
    AttributeMask, Capabilities, Cell, CellDimensions, Character, Color, ColorKind, CursorShape,
    CursorState, Decoder, Dialect, DiffRenderer, Engine, EnvConfig, Error, Event, Grid,
    GraphicsProtocol, Hyperlink, Image, Inbound, Key, KeyEventType, Modifiers, Mouse, MouseButton,
    MouseEventType, Placement, PlacementAction, PlacementStyle, ProcessTerminal, Queue, Report,
    Resize, Result, Screen, Style, Terminal, Token, Tokenizer, UnderlineStyle, WidthMethod, Window,
};

#[test]
fn public_api_exports_compile() {}
