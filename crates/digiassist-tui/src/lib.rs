// Terminal front end for the DigiAssist diagnostic client.

pub mod tui;
