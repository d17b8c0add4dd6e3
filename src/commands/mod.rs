// Register application commands.

// The interactive install/uninstall menu.
pub mod menu;
