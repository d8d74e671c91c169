pub mod test_screen_share;
pub mod test_toggle_video;
