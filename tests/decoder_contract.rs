// Contract tests shared by every built-in decode strategy.
use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;

use quarry::api::{
    Client, ClientConfig, DecodeError, Decoder, DecoderKind, FastCompatibleDecoder, FastDecoder,
    FastestDecoder, StandardDecoder,
};
use serde::Deserialize;
use serde::de::DeserializeOwned;

#[derive(Debug, Default, Deserialize, PartialEq)]
struct Record {
    a: i64,
    b: String,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
struct SearchResult {
    took: u64,
    timed_out: bool,
    hits: Hits,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
struct Hits {
    total: u64,
    max_score: Option<f64>,
    hits: Vec<Hit>,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
struct Hit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_score")]
    score: Option<f64>,
    #[serde(rename = "_source")]
    source: BTreeMap<String, serde_json::Value>,
}

const SEARCH_BODY: &[u8] = br#"{
  "took": 3,
  "timed_out": false,
  "hits": {
    "total": 2,
    "max_score": 1.25,
    "hits": [
      {"_id": "1", "_score": 1.25, "_source": {"user": "olivere", "retweets": 108}},
      {"_id": "2", "_score": null, "_source": {"user": "sandrae", "tags": ["a", "b"]}}
    ]
  }
}"#;

fn decode_all<T>(payload: &[u8]) -> Vec<(DecoderKind, Result<T, DecodeError>)>
where
    T: DeserializeOwned + Default,
{
    DecoderKind::ALL
        .into_iter()
        .map(|kind| {
            let client = Client::from_config(&ClientConfig::new().with_decoder(kind));
            let mut destination = T::default();
            let outcome = client.decode(payload, &mut destination).map(|()| destination);
            (kind, outcome)
        })
        .collect()
}

#[test]
fn record_payload_decodes_on_every_variant() {
    for (kind, outcome) in decode_all::<Record>(br#"{"a":1,"b":"x"}"#) {
        let record = outcome.unwrap_or_else(|err| panic!("{kind}: {err}"));
        assert_eq!(
            record,
            Record {
                a: 1,
                b: "x".to_string()
            },
            "{kind}"
        );
    }
}

#[test]
fn search_body_decodes_equally_on_every_variant() {
    let results = decode_all::<SearchResult>(SEARCH_BODY);
    let (_, baseline) = &results[0];
    let baseline = baseline.as_ref().expect("standard decode");
    assert_eq!(baseline.hits.hits.len(), 2);
    assert_eq!(baseline.hits.hits[0].source["user"], "olivere");
    assert_eq!(baseline.hits.hits[1].score, None);

    for (kind, outcome) in &results[1..] {
        let decoded = outcome.as_ref().unwrap_or_else(|err| panic!("{kind}: {err}"));
        assert_eq!(decoded, baseline, "{kind}");
    }
}

#[test]
fn empty_array_decodes_to_empty_sequence() {
    for (kind, outcome) in decode_all::<Vec<Record>>(b"[]") {
        let items = outcome.unwrap_or_else(|err| panic!("{kind}: {err}"));
        assert!(items.is_empty(), "{kind}");
    }
}

#[test]
fn non_json_payload_fails_on_every_variant() {
    for (kind, outcome) in decode_all::<serde_json::Value>(b"not json") {
        let err = outcome.expect_err("not json");
        assert_eq!(err.decoder(), kind.as_str());
    }
    for (kind, outcome) in decode_all::<Record>(b"not json") {
        assert!(outcome.is_err(), "{kind}");
    }
}

#[test]
fn empty_payload_fails_on_every_variant() {
    for (kind, outcome) in decode_all::<serde_json::Value>(b"") {
        assert!(outcome.is_err(), "{kind} accepted empty input");
    }
    for (kind, outcome) in decode_all::<Vec<u8>>(b"") {
        assert!(outcome.is_err(), "{kind} accepted empty input");
    }
}

#[test]
fn truncated_and_unbalanced_payloads_fail() {
    let cases: [&[u8]; 4] = [
        br#"{"a":1,"b":"x""#,
        br#"{"a":1,"b":"x"}}"#,
        br#"[1,2"#,
        br#"{"a":[1,2}"#,
    ];
    for case in cases {
        for (kind, outcome) in decode_all::<serde_json::Value>(case) {
            assert!(
                outcome.is_err(),
                "{kind} accepted {:?}",
                String::from_utf8_lossy(case)
            );
        }
    }
}

#[test]
fn array_into_record_is_a_shape_mismatch() {
    for payload in [b"[true,false]".as_slice(), b"[]".as_slice(), b"[1,2,3]".as_slice()] {
        for (kind, outcome) in decode_all::<Record>(payload) {
            assert!(outcome.is_err(), "{kind} accepted array into record");
        }
    }
}

#[test]
fn decoding_twice_yields_equal_results() {
    for kind in DecoderKind::ALL {
        let mut first = SearchResult::default();
        let mut second = SearchResult::default();
        kind.decode(SEARCH_BODY, &mut first).expect("first");
        kind.decode(SEARCH_BODY, &mut second).expect("second");
        assert_eq!(first, second, "{kind}");
    }
}

#[test]
fn success_overwrites_prior_destination_contents() {
    for kind in DecoderKind::ALL {
        let mut items = vec![9u32, 9, 9];
        kind.decode(b"[1]", &mut items).expect("decode");
        assert_eq!(items, vec![1], "{kind}");
    }
}

#[test]
fn failure_leaves_destination_untouched() {
    for kind in DecoderKind::ALL {
        let mut record = Record {
            a: 7,
            b: "kept".to_string(),
        };
        kind.decode(br#"{"a":1,"b":"#, &mut record)
            .expect_err("truncated");
        assert_eq!(record.a, 7, "{kind}");
        assert_eq!(record.b, "kept", "{kind}");
    }
}

#[test]
fn payload_is_never_mutated() {
    let payload = SEARCH_BODY.to_vec();
    for kind in DecoderKind::ALL {
        let mut value = serde_json::Value::Null;
        kind.decode(&payload, &mut value).expect("decode");
        assert_eq!(payload.as_slice(), SEARCH_BODY, "{kind}");
    }
}

#[test]
fn concrete_variants_match_kind_dispatch() {
    fn decode_with<D: Decoder>(decoder: D) -> Record {
        let mut record = Record::default();
        decoder
            .decode(br#"{"a":42,"b":"y"}"#, &mut record)
            .expect("decode");
        record
    }

    let expected = decode_with(DecoderKind::Standard);
    assert_eq!(decode_with(StandardDecoder), expected);
    assert_eq!(decode_with(FastDecoder), expected);
    assert_eq!(decode_with(FastCompatibleDecoder), expected);
    assert_eq!(decode_with(FastestDecoder), expected);
}

#[test]
fn shared_strategy_decodes_concurrently() {
    for kind in DecoderKind::ALL {
        let client = Client::from_config(&ClientConfig::new().with_decoder(kind));
        thread::scope(|scope| {
            for worker in 0..8u64 {
                let client = client.clone();
                scope.spawn(move || {
                    for round in 0..50u64 {
                        let n = worker * 1000 + round;
                        let body = format!(r#"{{"a":{n},"b":"w{worker}"}}"#);
                        let mut record = Record::default();
                        client.decode(body.as_bytes(), &mut record).expect("decode");
                        assert_eq!(record.a, n as i64);
                        assert_eq!(record.b, format!("w{worker}"));

                        let mut result = SearchResult::default();
                        client.decode(SEARCH_BODY, &mut result).expect("search");
                        assert_eq!(result.hits.total, 2);
                    }
                });
            }
        });
    }
}

#[test]
fn arc_wrapped_custom_strategy_can_be_installed() {
    #[derive(Debug)]
    struct Counting {
        inner: FastCompatibleDecoder,
        calls: std::sync::atomic::AtomicUsize,
    }

    impl Decoder for Counting {
        fn decode<T>(&self, payload: &[u8], destination: &mut T) -> Result<(), DecodeError>
        where
            T: DeserializeOwned,
        {
            self.calls
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            self.inner.decode(payload, destination)
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    let strategy = Arc::new(Counting {
        inner: FastCompatibleDecoder,
        calls: Default::default(),
    });
    let client = Client::new().with_decoder(Arc::clone(&strategy));
    let mut record = Record::default();
    client.decode(br#"{"a":1,"b":"x"}"#, &mut record).expect("decode");
    let err = client.decode(b"oops", &mut record).expect_err("err");

    assert_eq!(client.decoder().name(), "counting");
    assert_eq!(err.decoder(), "fast-compatible");
    assert_eq!(
        strategy.calls.load(std::sync::atomic::Ordering::Relaxed),
        2
    );
}
