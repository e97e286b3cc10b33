#![no_main]

use std::io::Cursor;

use libfuzzer_sys::fuzz_target;
use blocksig::{BlockHash, GroupedWriter};

fuzz_target!(|data: Vec<u8>| {
    let Some((&header, rest)) = data.split_first() else {
        return;
    };
    let group_size = usize::from(header % 9) + 1;
    let count = rest.len().min(200);

    // Each input byte picks one of the remaining positions
    let mut remaining: Vec<u64> = (0..count as u64).collect();
    let mut order = Vec::with_capacity(count);
    for &b in &rest[..count] {
        let pick = usize::from(b) % remaining.len();
        order.push(remaining.swap_remove(pick));
    }

    let mut writer = GroupedWriter::new(Cursor::new(Vec::new()), group_size);
    for &position in &order {
        writer
            .accept(&BlockHash::new(position, format!("{position:08X}")))
            .unwrap();
    }
    writer.finish().unwrap();

    // Verify: output is the dense, ordered listing regardless of arrival order
    let expected: String = (0..count as u64).map(|p| format!("{p:08X}\n")).collect();
    let written = writer.into_inner().into_inner();
    assert_eq!(written, expected.as_bytes());
});
