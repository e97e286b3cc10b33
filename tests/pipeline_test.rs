// Integration tests for the signature pipeline
// Tests cover: output format, padding, ordering under parallel hashing, setup errors,
// stage wiring, failures mid-run

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

use blocksig::{
    Block, BlockHash, BlockHashStage, BlockHasher, BlockReader, HashAlgorithm, HashWriter,
    HysteresisQueue, Md5Hasher, Result, SignatureConfig, SignatureError, SignatureSummary, Stage,
    StageRunner, WRITER_STAGE, generate_signature, run_pipeline,
};

fn hex(digest: &[u8]) -> String {
    digest.iter().map(|b| format!("{b:02X}")).collect()
}

/// Signature computed block by block on the calling thread.
fn sequential_md5(data: &[u8], block_size: usize) -> Vec<u8> {
    let mut out = Vec::new();
    for chunk in data.chunks(block_size) {
        let mut block = chunk.to_vec();
        block.resize(block_size, 0);
        out.extend_from_slice(hex(&Md5Hasher::hash(&block)).as_bytes());
        out.push(b'\n');
    }
    out
}

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 + i / 7) as u8).collect()
}

fn small_config() -> SignatureConfig {
    SignatureConfig::default()
        .with_block_size(512)
        .with_parallelism(4)
        .with_group_size(5)
        .with_block_queue_capacity(6)
        .with_hash_queue_capacity(6)
}

/// Wires the stages by hand so block sizes below the configured minimum
/// can be exercised.
fn run_stages(input: &Path, output: &Path, block_size: usize, hashers: usize, group_size: usize) {
    let blocks: Arc<HysteresisQueue<Block>> = Arc::new(HysteresisQueue::new(4, 0.25));
    let hashes: Arc<HysteresisQueue<BlockHash>> = Arc::new(HysteresisQueue::new(4, 0.25));

    let mut runners: Vec<StageRunner<Stage<Md5Hasher>>> = vec![StageRunner::new(
        "Output file writer",
        HashWriter::new(output, group_size, Arc::clone(&hashes)).into(),
    )];
    for i in 0..hashers {
        runners.push(StageRunner::new(
            format!("Hasher #{i}"),
            BlockHashStage::new(Arc::clone(&blocks), Arc::clone(&hashes), Md5Hasher::new()).into(),
        ));
    }
    runners.push(StageRunner::new(
        "Input file reader",
        BlockReader::new(input, block_size, Arc::clone(&blocks)).into(),
    ));

    let handles: Vec<_> = runners.into_iter().map(|r| r.spawn().unwrap()).collect();
    for handle in handles {
        handle.join().unwrap().unwrap();
    }
}

// ============================================================================
// Output Format
// ============================================================================

#[test]
fn test_tiny_blocks_with_padding() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("qwe.txt");
    let output = dir.path().join("qwe.sig");
    fs::write(&input, b"qwe").unwrap();

    run_stages(&input, &output, 2, 2, 3);

    let expected = format!(
        "{}\n{}\n",
        hex(&Md5Hasher::hash(b"qw")),
        hex(&Md5Hasher::hash(b"e\0"))
    );
    assert_eq!(fs::read_to_string(&output).unwrap(), expected);
}

#[test]
fn test_single_block_known_digest() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.txt");
    let output = dir.path().join("out.sig");
    fs::write(&input, b"qwerty").unwrap();

    run_stages(&input, &output, 3, 3, 128);

    assert_eq!(
        fs::read_to_string(&output).unwrap(),
        "76D80224611FC919A5D54F0FF9FBA446\n24113791D2218CB84C9F0462E91596EF\n"
    );
}

#[test]
fn test_every_line_is_uppercase_hex() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.bin");
    let output = dir.path().join("out.sig");
    fs::write(&input, pattern(512 * 9)).unwrap();

    generate_signature(&input, &output, &small_config()).unwrap();

    let text = fs::read_to_string(&output).unwrap();
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines.len(), 9);
    assert!(lines.iter().all(|l| {
        l.len() == 32 && l.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
    }));
}

// ============================================================================
// Ordering Under Parallel Hashing
// ============================================================================

#[test]
fn test_matches_sequential_signature() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.bin");
    let output = dir.path().join("out.sig");
    let data = pattern(512 * 37 + 100);
    fs::write(&input, &data).unwrap();

    let summary = generate_signature(&input, &output, &small_config()).unwrap();

    assert_eq!(summary.blocks, 38);
    assert_eq!(summary.digests, 38);
    assert_eq!(fs::read(&output).unwrap(), sequential_md5(&data, 512));
}

#[test]
fn test_dense_positions_across_group_sizes() {
    let data = pattern(512 * 23);
    let expected = sequential_md5(&data, 512);

    for group_size in [1, 2, 3, 7, 23, 24, 128] {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.bin");
        let output = dir.path().join("out.sig");
        fs::write(&input, &data).unwrap();

        let config = small_config().with_group_size(group_size);
        generate_signature(&input, &output, &config).unwrap();

        assert_eq!(
            fs::read(&output).unwrap(),
            expected,
            "group size {group_size}"
        );
    }
}

#[test]
fn test_single_hasher_and_unit_queues() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.bin");
    let output = dir.path().join("out.sig");
    let data = pattern(512 * 11 + 1);
    fs::write(&input, &data).unwrap();

    let config = small_config()
        .with_parallelism(1)
        .with_block_queue_capacity(1)
        .with_hash_queue_capacity(1);
    generate_signature(&input, &output, &config).unwrap();

    assert_eq!(fs::read(&output).unwrap(), sequential_md5(&data, 512));
}

#[cfg(feature = "hash-blake3")]
#[test]
fn test_blake3_signature() {
    use blocksig::Blake3Hasher;

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.bin");
    let output = dir.path().join("out.sig");
    let data = pattern(512 * 4);
    fs::write(&input, &data).unwrap();

    let config = small_config().with_algorithm(HashAlgorithm::Blake3);
    let summary = generate_signature(&input, &output, &config).unwrap();

    let expected: String = data
        .chunks(512)
        .map(|b| format!("{}\n", hex(&Blake3Hasher::hash(b))))
        .collect();
    assert_eq!(fs::read_to_string(&output).unwrap(), expected);
    assert_eq!(summary.output_size, 4 * 65);
}

#[test]
fn test_empty_input_gives_empty_signature() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("empty.bin");
    let output = dir.path().join("empty.sig");
    fs::write(&input, b"").unwrap();

    let summary = generate_signature(&input, &output, &small_config()).unwrap();

    assert_eq!(summary.blocks, 0);
    assert_eq!(fs::read(&output).unwrap(), b"");
}

// ============================================================================
// Setup Errors
// ============================================================================

#[test]
fn test_missing_input_creates_no_destination() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.sig");

    let err = generate_signature(dir.path().join("nope"), &output, &small_config()).unwrap_err();

    assert!(matches!(err, SignatureError::InputMissing { .. }));
    assert!(!output.exists());
}

#[test]
fn test_existing_destination_is_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.bin");
    let output = dir.path().join("out.sig");
    fs::write(&input, pattern(2048)).unwrap();
    fs::write(&output, b"previous").unwrap();

    let err = generate_signature(&input, &output, &small_config()).unwrap_err();

    assert!(matches!(err, SignatureError::OutputExists { .. }));
    assert_eq!(fs::read(&output).unwrap(), b"previous");
}

#[test]
fn test_block_size_out_of_range() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.bin");
    let output = dir.path().join("out.sig");
    fs::write(&input, b"data").unwrap();

    for size in [0, 511, 10 * 1024 * 1024 + 1] {
        let err = generate_signature(&input, &output, &small_config().with_block_size(size))
            .unwrap_err();
        assert!(matches!(err, SignatureError::BlockSizeOutOfRange { .. }), "size {size}");
    }
    assert!(!output.exists());
}

#[test]
fn test_block_size_bounds_are_accepted() {
    assert!(SignatureConfig::new(512).is_ok());
    assert!(SignatureConfig::new(10 * 1024 * 1024).is_ok());
}

// ============================================================================
// Failures Mid-Run
// ============================================================================

#[derive(Clone, Copy)]
enum Fault {
    /// The hasher that takes the n-th block panics on it.
    Panic,
    /// Every digest from the n-th block on is one byte longer.
    Widen,
}

/// MD5 that misbehaves once the hasher pool has taken `limit` blocks.
struct Faulty {
    inner: Md5Hasher,
    taken: Arc<AtomicUsize>,
    limit: usize,
    fault: Fault,
}

impl BlockHasher for Faulty {
    fn digest_len(&self) -> usize {
        match self.fault {
            Fault::Widen if self.taken.load(Ordering::SeqCst) >= self.limit => 17,
            _ => 16,
        }
    }

    fn digest_into(&mut self, data: &[u8], out: &mut [u8]) {
        let n = self.taken.fetch_add(1, Ordering::SeqCst) + 1;
        if matches!(self.fault, Fault::Panic) && n == self.limit {
            panic!("hasher gave up on block {n}");
        }
        out.fill(0);
        self.inner.digest_into(data, &mut out[..16]);
    }
}

/// Runs the pipeline on its own thread and fails the test if it does not
/// come back, so a hung stage shows up as a failure instead of a stuck run.
fn run_to_completion(dir: &Path, fault: Fault, limit: usize) -> Result<SignatureSummary> {
    let input = dir.join("in.bin");
    let output = dir.join("out.sig");
    fs::write(&input, pattern(512 * 200 + 7)).unwrap();

    let config = small_config()
        .with_parallelism(3)
        .with_group_size(4)
        .with_block_queue_capacity(1)
        .with_hash_queue_capacity(1);

    let (tx, rx) = mpsc::channel();
    let taken = Arc::new(AtomicUsize::new(0));
    thread::spawn(move || {
        let result = run_pipeline(&input, &output, &config, || Faulty {
            inner: Md5Hasher::new(),
            taken: Arc::clone(&taken),
            limit,
            fault,
        });
        tx.send(result).unwrap();
    });

    rx.recv_timeout(Duration::from_secs(30))
        .expect("pipeline did not finish, a stage is stuck")
}

#[test]
fn test_hasher_panic_is_reported_and_stages_join() {
    let dir = tempfile::tempdir().unwrap();

    let err = run_to_completion(dir.path(), Fault::Panic, 37).unwrap_err();

    match err {
        SignatureError::StagePanicked { stage } => {
            assert!(stage.starts_with("Hasher #"), "stage {stage}")
        }
        other => panic!("unexpected error: {other}"),
    }
    // The writer still ran to its end of stream
    assert!(dir.path().join("out.sig").exists());
}

#[test]
fn test_writer_failure_is_reported_and_stages_join() {
    let dir = tempfile::tempdir().unwrap();

    let err = run_to_completion(dir.path(), Fault::Widen, 20).unwrap_err();

    match err {
        SignatureError::StageFailed(err) => {
            assert_eq!(err.stage, WRITER_STAGE);
            assert!(
                matches!(
                    err.source,
                    SignatureError::DigestLengthMismatch {
                        expected: 32,
                        actual: 34,
                        ..
                    }
                ),
                "unexpected cause: {}",
                err.source
            );
        }
        other => panic!("unexpected error: {other}"),
    }
}
