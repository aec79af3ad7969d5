use super::*;
use std::io::Cursor;

fn filled(n: usize, fpr: f64) -> BloomFilter {
    let mut bf = BloomFilter::new(n, fpr);
    for i in 0..n {
        bf.add(format!("k{:06}", i).as_bytes());
    }
    bf
}

// -------------------- Sizing --------------------

#[test]
fn sizing_follows_expected_count() {
    let bf = BloomFilter::new(1000, 0.01);
    // -1000 * ln(0.01) / ln(2)^2 = 9585.06 -> 9586 bits, k = ceil(9.586 * ln 2) = 7
    assert_eq!(bf.num_bits(), 9586);
    assert_eq!(bf.num_hashes(), 7);
    assert_eq!(bf.bits.len(), 1199);
}

#[test]
fn zero_expected_items_sized_as_one() {
    let bf = BloomFilter::new(0, 0.01);
    assert_eq!(bf, BloomFilter::new(1, 0.01));
}

#[test]
fn predicted_size_matches_built_filter() {
    for (n, fpr) in [(0, 0.5), (1, 0.01), (1000, 0.01), (2500, 0.001), (77, 0.3)] {
        let bf = BloomFilter::new(n, fpr);
        assert_eq!(BloomFilter::serialized_size_for(n, fpr), bf.serialized_size());

        let mut buf = Vec::new();
        bf.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), bf.serialized_size());
    }
}

#[test]
fn predicted_size_flags_filters_past_the_read_limit() {
    // 2.3M keys at 1e-100 need ~1.1e9 bits, about 138 MB
    let size = BloomFilter::serialized_size_for(2_300_000, 1e-100);
    assert!(size > MAX_BLOOM_BYTES, "{} bytes", size);
    assert!(BloomFilter::serialized_size_for(1_000_000, DEFAULT_FALSE_POSITIVE_RATE) < MAX_BLOOM_BYTES);
}

#[test]
fn tiny_filter_has_minimum_bits() {
    let bf = BloomFilter::new(1, 0.5);
    assert_eq!(bf.num_bits(), 8);
    assert!(bf.num_hashes() >= 1);
}

#[test]
#[should_panic(expected = "false_positive_rate must be in (0, 1)")]
fn zero_fpr_panics() {
    BloomFilter::new(100, 0.0);
}

#[test]
#[should_panic(expected = "false_positive_rate must be in (0, 1)")]
fn unit_fpr_panics() {
    BloomFilter::new(100, 1.0);
}

// -------------------- Membership --------------------

#[test]
fn empty_filter_rejects_everything() {
    let bf = BloomFilter::new(100, 0.01);
    assert!(!bf.might_contain(b"anything"));
    assert_eq!(bf.count_ones(), 0);
}

#[test]
fn no_false_negatives() {
    let bf = filled(5000, 0.01);
    for i in 0..5000 {
        let key = format!("k{:06}", i);
        assert!(bf.might_contain(key.as_bytes()), "{} must be present", key);
    }
}

#[test]
fn empty_and_binary_keys() {
    let mut bf = BloomFilter::new(10, 0.01);
    bf.add(b"");
    bf.add(&[0u8, 255, 1, 254]);
    assert!(bf.might_contain(b""));
    assert!(bf.might_contain(&[0u8, 255, 1, 254]));
}

#[test]
fn observed_fpr_near_target() {
    let n = 10_000;
    let bf = filled(n, 0.01);

    let probes = 10_000;
    let hits = (0..probes)
        .filter(|i| bf.might_contain(format!("absent-{}", i).as_bytes()))
        .count();
    let observed = hits as f64 / probes as f64;
    assert!(observed < 0.03, "observed fpr {:.4} too high", observed);
}

#[test]
fn estimated_fpr_tracks_load() {
    let bf = BloomFilter::new(1000, 0.01);
    let at_capacity = bf.estimated_false_positive_rate(1000);
    assert!(at_capacity > 0.005 && at_capacity < 0.015);
    assert!(bf.estimated_false_positive_rate(5000) > at_capacity);
}

// -------------------- Persistence --------------------

#[test]
fn persisted_filter_answers_identically() {
    let bf = filled(500, 0.01);

    let mut buf = Vec::new();
    bf.write_to(&mut buf).unwrap();
    assert_eq!(buf.len(), bf.serialized_size());

    let loaded = BloomFilter::read_from(&mut Cursor::new(&buf)).unwrap();
    assert_eq!(loaded, bf);
    for i in 0..500 {
        assert!(loaded.might_contain(format!("k{:06}", i).as_bytes()));
    }
}

#[test]
fn read_rejects_oversized_bits() {
    let mut buf = Vec::new();
    buf.extend_from_slice(&64u64.to_le_bytes());
    buf.extend_from_slice(&3u32.to_le_bytes());
    buf.extend_from_slice(&(256 * 1024 * 1024u32).to_le_bytes());

    let err = BloomFilter::read_from(&mut Cursor::new(&buf)).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::InvalidData);
}

#[test]
fn read_rejects_length_mismatch() {
    let mut buf = Vec::new();
    buf.extend_from_slice(&64u64.to_le_bytes());
    buf.extend_from_slice(&3u32.to_le_bytes());
    buf.extend_from_slice(&4u32.to_le_bytes());
    buf.extend_from_slice(&[0u8; 4]);

    let err = BloomFilter::read_from(&mut Cursor::new(&buf)).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::InvalidData);
}

#[test]
fn read_rejects_zero_hashes() {
    let mut buf = Vec::new();
    buf.extend_from_slice(&8u64.to_le_bytes());
    buf.extend_from_slice(&0u32.to_le_bytes());
    buf.extend_from_slice(&1u32.to_le_bytes());
    buf.push(0);

    assert!(BloomFilter::read_from(&mut Cursor::new(&buf)).is_err());
}

#[test]
fn read_truncated_bits_is_eof() {
    let bf = filled(100, 0.01);
    let mut buf = Vec::new();
    bf.write_to(&mut buf).unwrap();
    buf.truncate(buf.len() - 1);

    let err = BloomFilter::read_from(&mut Cursor::new(&buf)).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
}

// -------------------- Debug --------------------

#[test]
fn debug_shows_shape() {
    let dbg = format!("{:?}", BloomFilter::new(100, 0.01));
    assert!(dbg.contains("num_bits"));
    assert!(dbg.contains("num_hashes"));
}
