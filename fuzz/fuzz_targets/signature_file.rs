#![no_main]

use libfuzzer_sys::fuzz_target;
use blocksig::{BlockHasher, HashAlgorithm, Md5Hasher, SignatureConfig, generate_signature};

fuzz_target!(|data: Vec<u8>| {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.bin");
    std::fs::write(&input, &data).unwrap();

    let configs = [
        SignatureConfig::default()
            .with_block_size(512)
            .with_parallelism(3)
            .with_group_size(2)
            .with_block_queue_capacity(2)
            .with_hash_queue_capacity(2),
        SignatureConfig::default()
            .with_block_size(4096)
            .with_parallelism(1)
            .with_group_size(128),
    ];

    for (i, config) in configs.iter().enumerate() {
        let config = config.with_algorithm(HashAlgorithm::Md5);
        let output = dir.path().join(format!("out-{i}.sig"));
        let summary = generate_signature(&input, &output, &config).unwrap();

        let block_size = config.block_size();
        let expected_blocks = data.len().div_ceil(block_size) as u64;
        assert_eq!(summary.blocks, expected_blocks);

        // Verify: every line is the digest of the zero-padded block at that position
        let mut hasher = Md5Hasher::new();
        let mut expected = Vec::new();
        for chunk in data.chunks(block_size) {
            let mut block = chunk.to_vec();
            block.resize(block_size, 0);
            let mut digest = [0u8; 16];
            hasher.digest_into(&block, &mut digest);
            for b in digest {
                expected.extend_from_slice(format!("{b:02X}").as_bytes());
            }
            expected.push(b'\n');
        }
        assert_eq!(std::fs::read(&output).unwrap(), expected);
    }
});
