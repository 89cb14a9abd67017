use std::collections::HashMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use vivogpt_gateway::canonical::{QueryParams, canonical_query_string};
use vivogpt_gateway::signing::{
  self, GatewaySigner, SIGNED_HEADER_NAMES, sign, signing_string
};
use vivogpt_gateway::Error;

const APP_ID: &str = "2025880184";
const APP_KEY: &str = "test-app-secret";
const URI: &str = "/vivogpt/completions";

fn reference_hmac(key: &str, message: &str) -> String
{   let mut mac = Hmac::<Sha256>::new_from_slice(key.as_bytes()).unwrap();
    mac.update(message.as_bytes());
    STANDARD.encode(mac.finalize().into_bytes())
}

fn query(pairs: &[(&str, &str)]) -> QueryParams
{   pairs.iter().map(|(k, v)| (*k, *v)).collect()
}

// ===== Canonical query string =====

#[test]
fn test_canonical_empty_and_absent()
{   assert_eq!(canonical_query_string(None), "");
    assert_eq!(canonical_query_string(Some(&QueryParams::new())), "");
}

#[test]
fn test_canonical_sorts_keys_by_byte_order()
{   let params = query(&[("b", "2"), ("a", "1"), ("Z", "0"), ("ab", "3")]);
    assert_eq!(
      canonical_query_string(Some(&params)),
      "Z=0&a=1&ab=3&b=2"
    );
}

#[test]
fn test_canonical_ignores_insertion_order()
{   let mut forward = HashMap::new();
    let mut backward = HashMap::new();
    let keys = ["requestId", "model", "x", "alpha", "zeta"];
    for (i, k) in keys.iter().enumerate()
    {   forward.insert(k.to_string(), i.to_string());
    }
    for (i, k) in keys.iter().enumerate().rev()
    {   backward.insert(k.to_string(), i.to_string());
    }
    let a: QueryParams = forward.into_iter().collect();
    let b: QueryParams = backward.into_iter().collect();
    assert_eq!(canonical_query_string(Some(&a)), canonical_query_string(Some(&b)));
}

#[test]
fn test_canonical_percent_encodes_keys_and_values()
{   let params = query(&[("q", "hello world&more"), ("k y", "a=b")]);
    assert_eq!(
      canonical_query_string(Some(&params)),
      "k%20y=a%3Db&q=hello%20world%26more"
    );
}

#[test]
fn test_canonical_omits_absent_values()
{   let mut params = QueryParams::new();
    params.insert("requestId", "r1");
    params.insert_opt("sessionId", None::<String>);
    params.insert_opt("empty", Some(""));
    assert_eq!(canonical_query_string(Some(&params)), "empty=&requestId=r1");

    let mut only_absent = QueryParams::new();
    only_absent.insert_opt("a", None::<&str>);
    assert!(only_absent.is_empty());
    assert_eq!(canonical_query_string(Some(&only_absent)), "");
}

// ===== Signature engine =====

#[test]
fn test_sign_matches_reference_hmac()
{   let message = "POST\n/path\n\napp\n1\nx";
    assert_eq!(sign(APP_KEY.as_bytes(), message).unwrap(), reference_hmac(APP_KEY, message));
}

#[test]
fn test_sign_is_deterministic_and_sensitive()
{   let a = sign(b"k", "signing string").unwrap();
    let b = sign(b"k", "signing string").unwrap();
    let c = sign(b"k", "signing strinh").unwrap();
    assert_eq!(a, b);
    assert_ne!(a, c);
    // 32-byte digest in standard base64
    assert_eq!(STANDARD.decode(&a).unwrap().len(), 32);
}

#[test]
fn test_sign_rejects_empty_secret()
{   let result = sign(b"", "anything");
    assert!(matches!(result, Err(Error::Signature(_))));
}

// ===== Auth header builder =====

#[test]
fn test_signing_string_layout()
{   let s = signing_string("post", URI, "requestId=r1", APP_ID, "1700000000", "abc12345");
    let expected = [
      "POST"
    , URI
    , "requestId=r1"
    , APP_ID
    , "1700000000"
    , "x-ai-gateway-app-id:2025880184"
    , "x-ai-gateway-timestamp:1700000000"
    , "x-ai-gateway-nonce:abc12345"
    ].join("\n");
    assert_eq!(s, expected);
}

#[test]
fn test_signature_validates_against_reconstruction()
{   let signer = GatewaySigner::new(APP_ID, APP_KEY);
    let params = query(&[("requestId", "6f1c2b7e")]);
    let headers = signer.sign_request("post", URI, &params).unwrap();

    let rebuilt = format!(
      "POST\n{}\nrequestId=6f1c2b7e\n{}\n{}\n\
       x-ai-gateway-app-id:{}\nx-ai-gateway-timestamp:{}\nx-ai-gateway-nonce:{}",
      URI, APP_ID, headers.timestamp, APP_ID, headers.timestamp, headers.nonce
    );
    assert_eq!(headers.signature, reference_hmac(APP_KEY, &rebuilt));
    assert_eq!(headers.app_id, APP_ID);
    assert_eq!(headers.signed_headers, SIGNED_HEADER_NAMES);
}

#[test]
fn test_signature_changes_with_each_signed_input()
{   let signer = GatewaySigner::new(APP_ID, APP_KEY);
    let params = query(&[("requestId", "r1")]);
    let base = signer
      .sign_request_at("POST", URI, &params, "1700000000", "abcdefgh")
      .unwrap()
      .signature;

    let variants = [
      signer.sign_request_at("GET", URI, &params, "1700000000", "abcdefgh")
    , signer.sign_request_at("POST", "/other", &params, "1700000000", "abcdefgh")
    , signer.sign_request_at("POST", URI, &query(&[("requestId", "r2")]), "1700000000", "abcdefgh")
    , GatewaySigner::new("other-app", APP_KEY)
        .sign_request_at("POST", URI, &params, "1700000000", "abcdefgh")
    , signer.sign_request_at("POST", URI, &params, "1700000001", "abcdefgh")
    ];
    for variant in variants
    {   assert_ne!(variant.unwrap().signature, base);
    }
}

#[test]
fn test_method_is_uppercased_before_signing()
{   let signer = GatewaySigner::new(APP_ID, APP_KEY);
    let params = QueryParams::new();
    let lower = signer.sign_request_at("post", URI, &params, "1", "nnnnnnnn").unwrap();
    let upper = signer.sign_request_at("POST", URI, &params, "1", "nnnnnnnn").unwrap();
    assert_eq!(lower.signature, upper.signature);
}

#[test]
fn test_fresh_nonce_and_timestamp_per_call()
{   let signer = GatewaySigner::new(APP_ID, APP_KEY);
    let params = QueryParams::new();
    let a = signer.sign_request("POST", URI, &params).unwrap();
    let b = signer.sign_request("POST", URI, &params).unwrap();
    assert_ne!(a.nonce, b.nonce);
    assert_ne!(a.signature, b.signature);

    let now: u64 = signing::unix_timestamp().unwrap().parse().unwrap();
    let ts: u64 = a.timestamp.parse().unwrap();
    assert!(now.abs_diff(ts) <= 2);
}

#[test]
fn test_uri_must_be_bare_path()
{   let signer = GatewaySigner::new(APP_ID, APP_KEY);
    let params = QueryParams::new();
    for uri in ["https://api-ai.vivo.com.cn/vivogpt", "/vivogpt?x=1", "vivogpt"]
    {   let result = signer.sign_request("POST", uri, &params);
        assert!(matches!(result, Err(Error::InvalidConfiguration(_))), "{}", uri);
    }
}

#[test]
fn test_empty_app_key_is_signature_error()
{   let signer = GatewaySigner::new(APP_ID, "");
    let result = signer.sign_request("POST", URI, &QueryParams::new());
    assert!(matches!(result, Err(Error::Signature(_))));
}

#[test]
fn test_header_pairs_in_wire_order()
{   let signer = GatewaySigner::new(APP_ID, APP_KEY);
    let headers = signer
      .sign_request_at("POST", URI, &QueryParams::new(), "1700000000", "abcdefgh")
      .unwrap();
    let names: Vec<&str> = headers.pairs().iter().map(|(n, _)| *n).collect();
    assert_eq!(
      names,
      vec![
        "X-AI-GATEWAY-APP-ID"
      , "X-AI-GATEWAY-TIMESTAMP"
      , "X-AI-GATEWAY-NONCE"
      , "X-AI-GATEWAY-SIGNED-HEADERS"
      , "X-AI-GATEWAY-SIGNATURE"
      ]
    );
}
