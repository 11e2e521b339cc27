//! Property-based tests for value encodings.
//!
//! - The tagged encoding reconstructs every scalar exactly
//! - Canonical encoding is injective within a scalar kind

use cleanroom_types::Scalar;
use proptest::prelude::*;

fn scalar_strategy() -> impl Strategy<Value = Scalar> {
    prop_oneof![
        ".{0,64}".prop_map(Scalar::Text),
        any::<i64>().prop_map(Scalar::Int),
        any::<f64>()
            .prop_filter("NaN never compares equal", |f| !f.is_nan())
            .prop_map(Scalar::Float),
        any::<bool>().prop_map(Scalar::Bool),
        any::<i32>().prop_map(Scalar::Date),
        prop::collection::vec(any::<u8>(), 0..256).prop_map(Scalar::Bytes),
    ]
}

proptest! {
    /// decode(encode(s)) == s and consumes exactly what was written
    #[test]
    fn tagged_roundtrip(scalar in scalar_strategy()) {
        let mut out = Vec::new();
        scalar.encode_tagged(&mut out).unwrap();
        let (decoded, used) = Scalar::decode_tagged(&out).unwrap();
        prop_assert_eq!(used, out.len());
        prop_assert_eq!(decoded, scalar);
    }

    /// Every float, NaN and signed zero included, keeps its exact bits
    #[test]
    fn tagged_float_keeps_bits(bits in any::<u64>()) {
        let mut out = Vec::new();
        Scalar::Float(f64::from_bits(bits)).encode_tagged(&mut out).unwrap();
        let (decoded, _) = Scalar::decode_tagged(&out).unwrap();
        match decoded {
            Scalar::Float(f) => prop_assert_eq!(f.to_bits(), bits),
            other => prop_assert!(false, "expected a float, got {:?}", other),
        }
    }

    /// Distinct integers never share canonical bytes
    #[test]
    fn int_canonical_injective(a in any::<i64>(), b in any::<i64>()) {
        prop_assume!(a != b);
        prop_assert_ne!(Scalar::Int(a).canonical_bytes(), Scalar::Int(b).canonical_bytes());
    }

    /// Distinct strings never share canonical bytes
    #[test]
    fn text_canonical_injective(a in ".{0,32}", b in ".{0,32}") {
        prop_assume!(a != b);
        prop_assert_ne!(
            Scalar::Text(a).canonical_bytes(),
            Scalar::Text(b).canonical_bytes()
        );
    }
}
