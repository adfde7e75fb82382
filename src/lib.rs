#![crate_name = "pixelcart"]

pub mod app;
pub mod block;
pub mod cartridge;
pub mod command;
pub mod config;
pub mod display_headless;
pub mod display_manager;
pub mod display_ratatui;
pub mod display_trait;
pub mod error;
pub mod header;
pub mod interpreter;
pub mod manifest;
pub mod marker;
pub mod observer;
pub mod snake;
pub mod string_table;
pub mod transform;
pub mod truth_table;
pub mod util;
pub mod xorshift;

#[doc(hidden)]
pub mod test_utils;


/*
A cartridge-carrying JPEG

        FFD8            SOI
        FFE0 ...        APP0 (JFIF)
        FFDB ...        DQT
        FFC0 ...        SOF0
        FFC4 ...        DHT
        FFEB len JCRT.. APP11, one block per segment
        FFEB len JCRT..
        FFDA ...        SOS, entropy-coded data follows
        FFD9            EOI
*/
