// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::request::Request;
use crate::wire::{decode, encode};
use lf_core::{ExecutionId, RunId};
use proptest::prelude::*;

fn arb_exec() -> impl Strategy<Value = ExecutionId> {
    ("[a-z0-9-]{1,16}", "[a-z0-9-]{1,24}", "[a-zA-Z0-9_-]{1,17}").prop_map(
        |(namespace, workflow_id, run)| {
            ExecutionId::new(namespace, workflow_id, RunId::from_string(format!("run-{run}")))
        },
    )
}

proptest! {
    #[test]
    fn get_history_round_trips(exec in arb_exec(), from_event_id in 0i64..10_000) {
        let request = Request::GetHistory { exec, from_event_id };
        let frame = encode(&request).unwrap();
        let payload = &frame[4..];
        let back: Request = decode(payload).unwrap();
        prop_assert_eq!(back, request);
    }

    #[test]
    fn signal_round_trips(exec in arb_exec(), name in "[a-z_]{1,32}", n in any::<i64>()) {
        let request = Request::SignalWorkflow {
            exec,
            name,
            payload: serde_json::json!({ "n": n }),
        };
        let frame = encode(&request).unwrap();
        let back: Request = decode(&frame[4..]).unwrap();
        prop_assert_eq!(back, request);
    }

    #[test]
    fn length_prefix_matches_payload(name in "[a-z_]{1,32}") {
        let request = Request::CancelWorkflow {
            exec: ExecutionId::new("ns", "wf", RunId::from_string("run-x")),
            reason: Some(name),
        };
        let frame = encode(&request).unwrap();
        let len = u32::from_be_bytes([frame[0], frame[1], frame[2], frame[3]]) as usize;
        prop_assert_eq!(len, frame.len() - 4);
    }
}
