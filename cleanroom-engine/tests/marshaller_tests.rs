use cleanroom_crypto::{derive_keys, KeyMaterial, SharedSecret, SEAL_OVERHEAD};
use cleanroom_engine::{EngineError, Marshaller, RowError};
use cleanroom_schema::{ClientSettings, ColumnSpec, Mode, Pad, Schema};
use cleanroom_types::{CollaborationId, Row, Scalar, TableHeader, Value};
use pretty_assertions::assert_eq;

const COLLAB: &str = "b2f2e9a4-0d3e-4c55-8a4f-8f3d2a1c0b9e";

fn keys() -> KeyMaterial {
    let secret = SharedSecret::from_bytes((0u8..32).collect());
    derive_keys(&secret, &CollaborationId::parse(COLLAB).unwrap()).unwrap()
}

fn other_keys() -> KeyMaterial {
    let secret = SharedSecret::from_bytes(vec![7u8; 32]);
    derive_keys(&secret, &CollaborationId::parse(COLLAB).unwrap()).unwrap()
}

fn header(names: &[&str]) -> TableHeader {
    TableHeader::from_names(names).unwrap()
}

fn bind(
    columns: Vec<ColumnSpec>,
    mode: Mode,
    input: &[&str],
    keys: &KeyMaterial,
    settings: ClientSettings,
) -> Result<Marshaller, EngineError> {
    let validated = Schema::new(columns).validate(&settings, mode)?;
    Marshaller::new(&validated, &header(input), keys, &settings)
}

fn encryptor(columns: Vec<ColumnSpec>, input: &[&str]) -> Marshaller {
    bind(
        columns,
        Mode::Encrypt,
        input,
        &keys(),
        ClientSettings::lowest_privacy(),
    )
    .unwrap()
}

fn decryptor(columns: Vec<ColumnSpec>, input: &[&str], keys: &KeyMaterial) -> Marshaller {
    bind(
        columns,
        Mode::Decrypt,
        input,
        keys,
        ClientSettings::lowest_privacy(),
    )
    .unwrap()
}

fn three_columns() -> Vec<ColumnSpec> {
    vec![
        ColumnSpec::cleartext("id").unwrap(),
        ColumnSpec::fingerprint("email").unwrap(),
        ColumnSpec::sealed("ssn").unwrap(),
    ]
}

fn sample_row() -> Row {
    Row::from_texts(["42", "a@b.com", "123-45-6789"])
}

// ── binding ──────────────────────────────────────────────────────

#[test]
fn output_header_follows_schema() {
    let m = encryptor(
        vec![
            ColumnSpec::sealed("ssn").unwrap().with_target("ssn_enc").unwrap(),
            ColumnSpec::cleartext("id").unwrap(),
        ],
        &["id", "ssn"],
    );
    assert_eq!(m.output_header(), &header(&["ssn_enc", "id"]));
    assert_eq!(m.input_header(), &header(&["id", "ssn"]));
    assert_eq!(m.mode(), Mode::Encrypt);
}

#[test]
fn missing_source_column_is_configuration_error() {
    let err = bind(
        three_columns(),
        Mode::Encrypt,
        &["id", "email"],
        &keys(),
        ClientSettings::lowest_privacy(),
    )
    .unwrap_err();
    assert!(err.is_configuration());
    assert!(err.to_string().contains("ssn"));
}

#[test]
fn encrypt_without_preserve_nulls_is_rejected_upfront() {
    let settings = ClientSettings {
        preserve_nulls: false,
        ..ClientSettings::lowest_privacy()
    };
    let err = bind(
        three_columns(),
        Mode::Encrypt,
        &["id", "email", "ssn"],
        &keys(),
        settings,
    )
    .unwrap_err();
    assert!(err.is_configuration());
    assert!(err.to_string().contains("preserve_nulls"));
}

#[test]
fn decrypt_without_preserve_nulls_is_accepted() {
    let settings = ClientSettings {
        preserve_nulls: false,
        ..ClientSettings::lowest_privacy()
    };
    let m = bind(
        vec![ColumnSpec::sealed("ssn").unwrap()],
        Mode::Decrypt,
        &["ssn"],
        &keys(),
        settings,
    );
    assert!(m.is_ok());
}

// ── encrypt ──────────────────────────────────────────────────────

#[test]
fn cleartext_is_copied() {
    let m = encryptor(three_columns(), &["id", "email", "ssn"]);
    let out = m.marshal(&sample_row()).unwrap();
    assert_eq!(out.get(0), Some(&Value::text("42")));
}

#[test]
fn fingerprint_is_deterministic() {
    let m = encryptor(three_columns(), &["id", "email", "ssn"]);
    let a = m.marshal(&sample_row()).unwrap();
    let b = m.marshal(&sample_row()).unwrap();
    assert!(matches!(a.get(1), Some(Value::Fingerprint(_))));
    assert_eq!(a.get(1), b.get(1));
}

#[test]
fn sealed_is_randomized_with_fixed_overhead() {
    let m = encryptor(three_columns(), &["id", "email", "ssn"]);
    let a = m.marshal(&sample_row()).unwrap();
    let b = m.marshal(&sample_row()).unwrap();
    assert_ne!(a.get(2), b.get(2));
    match a.get(2) {
        Some(Value::Sealed(blob)) => {
            // version + tag + u32 length + "123-45-6789"
            assert_eq!(blob.len(), SEAL_OVERHEAD + 1 + 1 + 4 + 11);
        }
        other => panic!("expected sealed value, got {other:?}"),
    }
}

#[test]
fn columns_can_be_reordered_and_dropped() {
    let m = encryptor(
        vec![
            ColumnSpec::sealed("ssn").unwrap(),
            ColumnSpec::cleartext("id").unwrap(),
        ],
        &["id", "email", "ssn"],
    );
    let out = m.marshal(&sample_row()).unwrap();
    assert_eq!(out.width(), 2);
    assert_eq!(out.get(1), Some(&Value::text("42")));
}

#[test]
fn one_source_can_feed_several_targets() {
    let m = encryptor(
        vec![
            ColumnSpec::fingerprint("email").unwrap(),
            ColumnSpec::sealed("email").unwrap().with_target("email_sealed").unwrap(),
        ],
        &["email"],
    );
    let out = m.marshal(&Row::from_texts(["a@b.com"])).unwrap();
    assert!(matches!(out.get(0), Some(Value::Fingerprint(_))));
    assert!(matches!(out.get(1), Some(Value::Sealed(_))));
}

#[test]
fn null_passes_through_every_transform() {
    let m = encryptor(three_columns(), &["id", "email", "ssn"]);
    let row = Row::new(vec![Value::Null, Value::Null, Value::Null]);
    let out = m.marshal(&row).unwrap();
    assert_eq!(out, row);
}

#[test]
fn width_mismatch_is_row_error() {
    let m = encryptor(three_columns(), &["id", "email", "ssn"]);
    let err = m.marshal(&Row::from_texts(["42", "a@b.com"])).unwrap_err();
    assert_eq!(
        err,
        RowError::WidthMismatch {
            expected: 3,
            actual: 2
        }
    );
    assert!(!err.is_fatal());
}

#[test]
fn already_encrypted_values_are_rejected() {
    let m = encryptor(three_columns(), &["id", "email", "ssn"]);

    let row = Row::new(vec![
        Value::text("1"),
        Value::Fingerprint([0u8; 32]),
        Value::text("x"),
    ]);
    assert!(matches!(
        m.marshal(&row),
        Err(RowError::AlreadyEncrypted { column }) if column == "email"
    ));

    let row = Row::from_texts(["1", "a@b.com", "01:enc:AAAA"]);
    assert!(matches!(
        m.marshal(&row),
        Err(RowError::AlreadyEncrypted { column }) if column == "ssn"
    ));
}

#[test]
fn pad_overflow_is_row_error() {
    let m = encryptor(
        vec![ColumnSpec::sealed("ssn").unwrap().with_pad(Pad::Fixed { length: 4 })],
        &["ssn"],
    );
    let err = m.marshal(&Row::from_texts(["123-45-6789"])).unwrap_err();
    assert_eq!(
        err,
        RowError::PadOverflow {
            column: "ssn".into(),
            length: 4,
            actual: 11
        }
    );
}

#[test]
fn fixed_pad_hides_length() {
    let m = encryptor(
        vec![ColumnSpec::sealed("name").unwrap().with_pad(Pad::Fixed { length: 32 })],
        &["name"],
    );
    let short = m.marshal(&Row::from_texts(["al"])).unwrap();
    let long = m.marshal(&Row::from_texts(["bartholomew"])).unwrap();
    let len = |r: &Row| match r.get(0) {
        Some(Value::Sealed(b)) => b.len(),
        other => panic!("expected sealed value, got {other:?}"),
    };
    assert_eq!(len(&short), len(&long));
}

#[test]
fn typed_scalars_fingerprint_by_canonical_encoding() {
    let m = encryptor(vec![ColumnSpec::fingerprint("n").unwrap()], &["n"]);
    let int = m.marshal(&Row::new(vec![Value::Clear(Scalar::Int(42))])).unwrap();
    let int_again = m.marshal(&Row::new(vec![Value::Clear(Scalar::Int(42))])).unwrap();
    let text = m.marshal(&Row::from_texts(["42"])).unwrap();
    assert_eq!(int, int_again);
    assert_ne!(int, text);
}

#[test]
fn equal_canonical_bytes_of_different_kinds_fingerprint_apart() {
    let m = encryptor(vec![ColumnSpec::fingerprint("n").unwrap()], &["n"]);
    let int = m
        .marshal(&Row::new(vec![Value::Clear(Scalar::Int(0x6162_6364_6566_6768))]))
        .unwrap();
    let text = m.marshal(&Row::from_texts(["abcdefgh"])).unwrap();
    assert_ne!(int, text);

    let t = m.marshal(&Row::new(vec![Value::Clear(Scalar::Bool(true))])).unwrap();
    let b = m
        .marshal(&Row::new(vec![Value::Clear(Scalar::Bytes(vec![1]))]))
        .unwrap();
    assert_ne!(t, b);
}

// ── fingerprint key scoping ──────────────────────────────────────

fn digest(m: &Marshaller, value: &str) -> Value {
    m.marshal(&Row::from_texts([value]))
        .unwrap()
        .get(0)
        .cloned()
        .unwrap()
}

#[test]
fn differently_named_columns_join_when_allowed() {
    let settings = ClientSettings::lowest_privacy();
    let a = bind(
        vec![ColumnSpec::fingerprint("email").unwrap()],
        Mode::Encrypt,
        &["email"],
        &keys(),
        settings,
    )
    .unwrap();
    let b = bind(
        vec![ColumnSpec::fingerprint("mail").unwrap()],
        Mode::Encrypt,
        &["mail"],
        &keys(),
        settings,
    )
    .unwrap();
    assert_eq!(digest(&a, "a@b.com"), digest(&b, "a@b.com"));
}

#[test]
fn differently_named_columns_do_not_join_when_forbidden() {
    let settings = ClientSettings {
        allow_joins_on_columns_with_different_names: false,
        ..ClientSettings::lowest_privacy()
    };
    let email = bind(
        vec![ColumnSpec::fingerprint("email").unwrap()],
        Mode::Encrypt,
        &["email"],
        &keys(),
        settings,
    )
    .unwrap();
    let email_again = bind(
        vec![ColumnSpec::fingerprint("email").unwrap()],
        Mode::Encrypt,
        &["email"],
        &keys(),
        settings,
    )
    .unwrap();
    let mail = bind(
        vec![ColumnSpec::fingerprint("mail").unwrap()],
        Mode::Encrypt,
        &["mail"],
        &keys(),
        settings,
    )
    .unwrap();
    assert_eq!(digest(&email, "a@b.com"), digest(&email_again, "a@b.com"));
    assert_ne!(digest(&email, "a@b.com"), digest(&mail, "a@b.com"));
}

// ── decrypt ──────────────────────────────────────────────────────

#[test]
fn decrypt_recovers_sealed_value() {
    let enc = encryptor(three_columns(), &["id", "email", "ssn"]);
    let encrypted = enc.marshal(&sample_row()).unwrap();

    let dec = decryptor(
        vec![
            ColumnSpec::cleartext("id").unwrap(),
            ColumnSpec::cleartext("email").unwrap(),
            ColumnSpec::sealed("ssn").unwrap(),
        ],
        &["id", "email", "ssn"],
        &keys(),
    );
    let out = dec.marshal(&encrypted).unwrap();
    assert_eq!(out.get(0), Some(&Value::text("42")));
    assert_eq!(out.get(1), encrypted.get(1));
    assert_eq!(out.get(2), Some(&Value::text("123-45-6789")));
}

#[test]
fn decrypt_accepts_textual_sealed_form() {
    let enc = encryptor(vec![ColumnSpec::sealed("ssn").unwrap()], &["ssn"]);
    let sealed = enc.marshal(&Row::from_texts(["123"])).unwrap();
    let text = sealed.get(0).unwrap().to_text().unwrap();
    assert!(text.starts_with("01:enc:"));

    let dec = decryptor(vec![ColumnSpec::sealed("ssn").unwrap()], &["ssn"], &keys());
    let out = dec.marshal(&Row::from_texts([text])).unwrap();
    assert_eq!(out, Row::from_texts(["123"]));
}

#[test]
fn decrypt_restores_typed_scalars() {
    let enc = encryptor(vec![ColumnSpec::sealed("v").unwrap()], &["v"]);
    let dec = decryptor(vec![ColumnSpec::sealed("v").unwrap()], &["v"], &keys());
    for scalar in [
        Scalar::Int(-7),
        Scalar::Float(2.5),
        Scalar::Bool(true),
        Scalar::Date(19_000),
        Scalar::Bytes(vec![0, 1, 2]),
    ] {
        let row = Row::new(vec![Value::Clear(scalar)]);
        let out = dec.marshal(&enc.marshal(&row).unwrap()).unwrap();
        assert_eq!(out, row);
    }
}

#[test]
fn decrypt_restores_exact_float_bits() {
    let enc = encryptor(vec![ColumnSpec::sealed("v").unwrap()], &["v"]);
    let dec = decryptor(vec![ColumnSpec::sealed("v").unwrap()], &["v"], &keys());
    for bits in [(-0.0f64).to_bits(), 0x7ff8_0000_0000_0001, 0xfff0_0000_0000_0abc] {
        let row = Row::new(vec![Value::Clear(Scalar::Float(f64::from_bits(bits)))]);
        let out = dec.marshal(&enc.marshal(&row).unwrap()).unwrap();
        match out.get(0) {
            Some(Value::Clear(Scalar::Float(f))) => assert_eq!(f.to_bits(), bits),
            other => panic!("expected a float, got {other:?}"),
        }
    }
}

#[test]
fn decrypt_with_wrong_key_fails_authentication() {
    let enc = encryptor(vec![ColumnSpec::sealed("ssn").unwrap()], &["ssn"]);
    let sealed = enc.marshal(&Row::from_texts(["123"])).unwrap();

    let dec = decryptor(vec![ColumnSpec::sealed("ssn").unwrap()], &["ssn"], &other_keys());
    let err = dec.marshal(&sealed).unwrap_err();
    assert!(matches!(err, RowError::Authentication { .. }));
    assert!(err.is_fatal());
}

#[test]
fn sealed_cell_moved_to_another_column_fails_authentication() {
    let enc = encryptor(vec![ColumnSpec::sealed("ssn").unwrap()], &["ssn"]);
    let sealed = enc.marshal(&Row::from_texts(["123"])).unwrap();

    let dec = decryptor(vec![ColumnSpec::sealed("phone").unwrap()], &["phone"], &keys());
    assert!(matches!(
        dec.marshal(&sealed),
        Err(RowError::Authentication { .. })
    ));
}

#[test]
fn renamed_sealed_column_decrypts_under_its_new_name() {
    let enc = encryptor(
        vec![ColumnSpec::sealed("ssn").unwrap().with_target("ssn_enc").unwrap()],
        &["ssn"],
    );
    let sealed = enc.marshal(&Row::from_texts(["123"])).unwrap();

    let dec = decryptor(
        vec![ColumnSpec::sealed("ssn_enc").unwrap().with_target("ssn").unwrap()],
        &["ssn_enc"],
        &keys(),
    );
    assert_eq!(dec.marshal(&sealed).unwrap(), Row::from_texts(["123"]));
    assert_eq!(dec.output_header(), &header(&["ssn"]));
}

#[test]
fn decrypt_of_plain_value_is_not_sealed() {
    let dec = decryptor(vec![ColumnSpec::sealed("ssn").unwrap()], &["ssn"], &keys());
    let err = dec.marshal(&Row::from_texts(["123-45-6789"])).unwrap_err();
    assert!(matches!(err, RowError::NotSealed { .. }));
    assert!(!err.is_fatal());
}

#[test]
fn decrypt_of_malformed_sealed_text_is_fatal() {
    let dec = decryptor(vec![ColumnSpec::sealed("ssn").unwrap()], &["ssn"], &keys());
    let err = dec.marshal(&Row::from_texts(["01:enc:!!!"])).unwrap_err();
    assert!(matches!(err, RowError::Decoding { .. }));
    assert!(err.is_fatal());
}

#[test]
fn decrypt_of_truncated_blob_fails_authentication() {
    let dec = decryptor(vec![ColumnSpec::sealed("ssn").unwrap()], &["ssn"], &keys());
    let err = dec
        .marshal(&Row::new(vec![Value::Sealed(vec![0u8; 10])]))
        .unwrap_err();
    assert!(matches!(err, RowError::Authentication { .. }));
}

#[test]
fn decrypt_passes_nulls_through() {
    let dec = decryptor(vec![ColumnSpec::sealed("ssn").unwrap()], &["ssn"], &keys());
    let row = Row::new(vec![Value::Null]);
    assert_eq!(dec.marshal(&row).unwrap(), row);
}

#[test]
fn decrypting_a_fingerprint_is_configuration_error() {
    let err = bind(
        three_columns(),
        Mode::Decrypt,
        &["id", "email", "ssn"],
        &keys(),
        ClientSettings::lowest_privacy(),
    )
    .unwrap_err();
    assert!(err.is_configuration());
}

// ── repeated input columns ───────────────────────────────────────

#[test]
fn repeated_input_columns_bind_by_occurrence() {
    let enc = encryptor(
        vec![
            ColumnSpec::sealed("a").unwrap().with_target("x").unwrap(),
            ColumnSpec::sealed("b").unwrap().with_target("x").unwrap(),
        ],
        &["a", "b"],
    );
    let sealed = enc.marshal(&Row::from_texts(["first", "second"])).unwrap();

    let dec = decryptor(
        vec![ColumnSpec::sealed("x").unwrap(), ColumnSpec::sealed("x").unwrap()],
        &["x", "x"],
        &keys(),
    );
    assert_eq!(dec.marshal(&sealed).unwrap(), Row::from_texts(["first", "second"]));
}

#[test]
fn repeated_input_column_read_too_often_is_configuration_error() {
    let err = bind(
        vec![
            ColumnSpec::cleartext("x").unwrap(),
            ColumnSpec::cleartext("x").unwrap(),
            ColumnSpec::cleartext("x").unwrap(),
        ],
        Mode::Decrypt,
        &["x", "x"],
        &keys(),
        ClientSettings::lowest_privacy(),
    )
    .unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn single_input_column_may_feed_several_outputs() {
    let m = encryptor(
        vec![
            ColumnSpec::cleartext("x").unwrap(),
            ColumnSpec::sealed("x").unwrap().with_target("x_sealed").unwrap(),
            ColumnSpec::cleartext("x").unwrap().with_target("x_copy").unwrap(),
        ],
        &["x"],
    );
    let out = m.marshal(&Row::from_texts(["v"])).unwrap();
    assert_eq!(out.get(0), Some(&Value::text("v")));
    assert_eq!(out.get(2), Some(&Value::text("v")));
}
