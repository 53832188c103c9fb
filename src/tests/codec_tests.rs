// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use crate::canonical::canonical_delta;
use crate::codec::{
    decode_bytes, decode_delta, decode_delta_stream, decode_template, diff_templates, encode_bytes,
    encode_delta, encode_delta_stream, encode_template, Op, Template,
};
use crate::error::{CodecError, WirePackError};
use crate::hash::state_hash;
use crate::workload::Workload;

#[test]
fn test_stream_replay_reaches_final_template() {
    let mut w = Workload::new(11, 128, 5_000);
    let base = w.values();
    let mut live = Template::new(base.clone());
    let mut deltas = Vec::new();
    for _ in 0..50 {
        let d = canonical_delta(&w.next_ops(4));
        live.apply_delta(&d).unwrap();
        deltas.push(d);
    }

    // Ship template + stream, rebuild on the other side.
    let wire_template = encode_template(&base);
    let wire_stream = encode_delta_stream(&deltas);

    let mut replayed = Template::from_bytes(&wire_template).unwrap();
    for frame in decode_delta_stream(&wire_stream).unwrap() {
        replayed.apply_delta(frame).unwrap();
    }
    assert_eq!(replayed, live);
    assert_eq!(state_hash(replayed.values()), state_hash(live.values()));
}

#[test]
fn test_diff_templates_is_a_sufficient_patch() {
    let mut w = Workload::new(12, 64, 100);
    let base = w.values();
    let mut current = Template::new(base.clone());
    for _ in 0..10 {
        current.apply_ops(&w.next_ops(3)).unwrap();
    }

    let patch = diff_templates(&base, current.values()).unwrap();
    let mut patched = Template::new(base);
    patched.apply_delta(&encode_delta(&patch)).unwrap();
    assert_eq!(patched, current);

    assert!(diff_templates(&[1, 2], &[1]).is_err());
    assert!(diff_templates(&[4, 5], &[4, 5]).unwrap().is_empty());
}

#[test]
fn test_container_wraps_template_and_stream() {
    let template = encode_template(&vec![7u32; 4096]);
    let packed = encode_bytes(&template).unwrap();
    assert!(packed.len() < template.len(), "repetitive template should deflate");
    assert_eq!(packed.len() % 4, 1, "uvarint(3) byte then whole words");
    assert_eq!(decode_bytes(&packed).unwrap(), template);

    let stream = encode_delta_stream(&[encode_delta(&[Op::new(0, 1)])]);
    let packed = encode_bytes(&stream).unwrap();
    assert_eq!(&packed[1..5], &0u32.to_le_bytes(), "short payload stays in identity mode");
    assert_eq!(decode_bytes(&packed).unwrap(), stream);
}

#[test]
fn test_malformed_inputs_are_codec_errors() {
    let cases: Vec<(&str, Result<(), CodecError>)> = vec![
        ("truncated template", decode_template(&[0x02, 0x01, 0x00]).map(|_| ())),
        ("template trailing", decode_template(&[0x00, 0xFF]).map(|_| ())),
        ("delta count lies", decode_delta(&[0x7F, 0x00]).map(|_| ())),
        ("varint runs off", decode_delta(&[0x80]).map(|_| ())),
        ("stream frame overruns", decode_delta_stream(&[0x01, 0x09, 0x00]).map(|_| ())),
        ("container header short", decode_bytes(&encode_template(&[0, 0])).map(|_| ())),
    ];
    for (name, result) in cases {
        assert!(result.is_err(), "{name} should be rejected");
    }

    let err: WirePackError = Template::from_bytes(&[0x01]).unwrap_err();
    assert!(err.is_malformed_input());
}

#[test]
fn test_out_of_range_delta_leaves_template_untouched() {
    let mut t = Template::new(vec![1, 2, 3]);
    let err = t
        .apply_delta(&encode_delta(&[Op::new(0, 9), Op::new(3, 9)]))
        .unwrap_err();
    assert_eq!(err, WirePackError::IndexOutOfRange { index: 3, len: 3 });
    assert_eq!(t.values(), &[1, 2, 3]);
    assert!(!err.is_malformed_input());
}
