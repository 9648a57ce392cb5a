pub mod app;
pub mod audio;
pub mod config;
pub mod frame;
pub mod layer;
pub mod prefs;
pub mod preview;
pub mod render;
pub mod scene;
pub mod terminal;
pub mod theme;
pub mod tracks;
