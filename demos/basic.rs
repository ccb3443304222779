//! Basic usage example for seekzip
//!
//! Run with `RUST_LOG=debug cargo run --example basic` to see the writer's log output.

use seekzip::{DosDateTime, EntryOptions, StreamingZipWriter};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    println!("=== seekzip Basic Example ===\n");

    println!("Creating test.zip...");
    let mut writer = StreamingZipWriter::new("test.zip")?;

    writer.add_entry("hello.txt", EntryOptions::stored(), b"Hello, seekzip!")?;

    writer.add_directory("folder", EntryOptions::default())?;

    let released = DosDateTime::from_date_and_time(2024, 1, 1, 12, 0, 0).unwrap_or_default();
    writer.begin_entry(
        "folder/data.txt",
        EntryOptions::deflated().modified(released).permissions(0o600),
    )?;
    for line in 1..=1000 {
        writer.write_data(format!("Line {}\n", line).as_bytes())?;
    }
    writer.close_entry()?;

    for entry in writer.entries() {
        println!(
            "  - {} ({} -> {} bytes, crc {:08x})",
            entry.name(),
            entry.uncompressed_size(),
            entry.compressed_size(),
            entry.crc32()
        );
    }

    writer.close()?;
    println!("\n✓ Created test.zip");

    Ok(())
}
