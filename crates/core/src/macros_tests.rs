// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#[derive(Debug, PartialEq)]
enum Verdict {
    Passed,
    Failed { reason: String },
    Skipped(u32),
}

crate::display_as_str! {
    Verdict {
        Passed => "passed",
        Failed { .. } => "failed",
        Skipped(..) => "skipped",
    }
}

#[derive(Default)]
struct Knobs {
    name: String,
    count: u32,
    label: Option<String>,
}

impl Knobs {
    crate::setters! {
        into name: String;
        set count: u32;
        opt label: String;
    }
}

#[test]
fn as_str_covers_every_variant_shape() {
    assert_eq!(Verdict::Passed.as_str(), "passed");
    assert_eq!(Verdict::Failed { reason: "x".into() }.as_str(), "failed");
    assert_eq!(Verdict::Skipped(3).as_str(), "skipped");
}

#[test]
fn display_matches_as_str() {
    assert_eq!(Verdict::Passed.to_string(), Verdict::Passed.as_str());
}

#[test]
fn setter_kinds() {
    let knobs = Knobs::default().name("queue").count(4).label("primary");
    assert_eq!(knobs.name, "queue");
    assert_eq!(knobs.count, 4);
    assert_eq!(knobs.label.as_deref(), Some("primary"));
}
