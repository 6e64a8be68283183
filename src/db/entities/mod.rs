pub mod watchdog_entry;
