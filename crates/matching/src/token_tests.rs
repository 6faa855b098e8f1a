// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn payload() -> TokenPayload {
    TokenPayload {
        task_id: TaskId::from_string("tsk-1"),
        namespace: "default".into(),
        task_queue: "workflow".into(),
        partition: 0,
        delivery: 1,
        nonce: "abc".into(),
    }
}

#[test]
fn signed_token_verifies() {
    let signer = TokenSigner::new(b"secret".to_vec());
    let token = signer.sign(payload()).unwrap();
    assert!(signer.verify(&token).is_ok());
}

#[test]
fn tampered_payload_fails() {
    let signer = TokenSigner::new(b"secret".to_vec());
    let mut token = signer.sign(payload()).unwrap();
    token.payload.delivery = 99;
    assert_eq!(signer.verify(&token), Err(MatchingError::InvalidToken));
}

#[test]
fn wrong_secret_fails() {
    let signer = TokenSigner::new(b"secret".to_vec());
    let other = TokenSigner::new(b"other".to_vec());
    let token = signer.sign(payload()).unwrap();
    assert_eq!(other.verify(&token), Err(MatchingError::InvalidToken));
}

#[test]
fn constant_time_eq_basics() {
    assert!(constant_time_eq(b"abc", b"abc"));
    assert!(!constant_time_eq(b"abc", b"abd"));
    assert!(!constant_time_eq(b"abc", b"ab"));
}
