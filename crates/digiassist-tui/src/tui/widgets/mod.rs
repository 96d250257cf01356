// TUI widget modules, one per screen region.

pub mod error_banner;
pub mod help_bar;
pub mod input_box;
pub mod intake_form;
pub mod progress_header;
pub mod quit_confirm;
pub mod results;
pub mod title_bar;
pub mod transcript;
