//! Example defining extension slots with a descriptor file.
//!
//! This example shows how to:
//! - Write a descriptor file with full, legacy, and spare records
//! - Read built-in and extension slots through the registry
//! - Observe the reload outcome when the file changes

use std::fs;

use observa::{OB_SPARE, OBSERVABLE_COUNT, ObservableId, RegistryConfig, SlotRegistry};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let config = RegistryConfig::new(dir.path());

    let mut descriptor = String::new();
    for i in 0..OB_SPARE {
        descriptor.push_str(&format!("{i},reserved\n"));
    }
    for i in OB_SPARE..OBSERVABLE_COUNT {
        let line = match i - OB_SPARE {
            0 => format!("{i},queue_depth,Jobs waiting in the print queue,jobs,0,25,1"),
            1 => format!("{i},swap_used,Swap in use (old format)"),
            2 => format!("{i},conn_errors,Failed outbound connections,errors,0,5,0"),
            _ => format!("{i},spare"),
        };
        descriptor.push_str(&line);
        descriptor.push('\n');
    }
    fs::write(config.descriptor_path(), descriptor)?;

    let mut registry = SlotRegistry::new(&config);
    println!("Refresh: {:?}", registry.refresh());

    for index in [0, 4, OB_SPARE, OB_SPARE + 1, OB_SPARE + 2, OB_SPARE + 3] {
        let id = ObservableId::new(index)?;
        if !registry.has_slot(id) {
            println!("{index:>3}: (undefined)");
            continue;
        }
        let attrs = registry.slot(id)?;
        println!(
            "{index:>3}: {:<12} [{} .. {}] {:<28} consolidable={}",
            attrs.name,
            attrs.expected_minimum,
            attrs.expected_maximum,
            attrs.units,
            attrs.consolidable
        );
    }

    // Unchanged file: the next refresh is a cache hit.
    println!("Refresh again: {:?}", registry.refresh());
    println!("Parses so far: {}", registry.parse_count());

    Ok(())
}
