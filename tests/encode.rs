use sirna_offtarget::encode::*;

#[test]
fn test_complementarity_pairs() {
    for (a, b) in [(b'A', b'U'), (b'G', b'C'), (b'G', b'U')] {
        assert!(is_complementary(a, b));
        assert!(is_complementary(b, a));
    }
    assert!(is_complementary(b'A', b'T'));
    for (a, b) in [(b'A', b'A'), (b'A', b'C'), (b'A', b'G'), (b'C', b'U'), (b'U', b'U')] {
        assert!(!is_complementary(a, b), "{} {}", a as char, b as char);
    }
    assert!(!is_complementary(b'N', b'U'));
}

#[test]
fn test_guide_validation() {
    let ok19 = "ACGUACGUACGUACGUACG";
    assert_eq!(validate_guide(ok19).unwrap(), ok19);
    assert_eq!(validate_guide("acgtacgtacgtacgtacgt").unwrap(), "ACGUACGUACGUACGUACGU");
    assert!(is_valid_guide(&"A".repeat(23)));

    assert_eq!(
        validate_guide(&"A".repeat(18)),
        Err(ValidationError::Length { len: 18 })
    );
    assert_eq!(
        validate_guide(&"A".repeat(24)),
        Err(ValidationError::Length { len: 24 })
    );
    assert_eq!(
        validate_guide("ACGUACGUANGUACGUACG"),
        Err(ValidationError::InvalidBase { base: 'N', pos: 9 })
    );
}

#[test]
fn test_reverse_and_revcomp() {
    assert_eq!(reverse(b"ACGU"), b"UGCA");
    assert_eq!(reverse_complement(b"CCACUGC"), b"GCAGUGG");
    assert_eq!(normalize("acgT"), "ACGU");
}

#[test]
fn test_encode_decode_revcomp_code() {
    let code = encode_kmer(b"GCAGUGG").unwrap();
    assert_eq!(decode_kmer(code, SEED_LEN), "GCAGUGG");
    let rc = revcomp_code(encode_kmer(b"CCACUGC").unwrap(), SEED_LEN);
    assert_eq!(rc, code);
    assert_eq!(encode_kmer(b"GCANUGG"), None);
    assert_eq!(encode_kmer(b"AC").unwrap(), 0b0001);
}

#[test]
fn test_hamming_neighbors() {
    let code = encode_kmer(b"AAAAAAA").unwrap();
    assert_eq!(hamming_neighbors(code, SEED_LEN, 0), vec![code]);
    let one = hamming_neighbors(code, SEED_LEN, 1);
    assert_eq!(one.len(), 1 + 7 * 3);
    assert_eq!(one[0], code);
    let two = hamming_neighbors(code, SEED_LEN, 2);
    assert_eq!(two.len(), 1 + 21 + 21 * 3 * 3);
    let mut dedup = two.clone();
    dedup.sort_unstable();
    dedup.dedup();
    assert_eq!(dedup.len(), two.len());
}
