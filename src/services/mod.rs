pub mod avatar;
pub mod backend;
pub mod console;
pub mod playback;
pub mod vision;
