//! Property-based tests using proptest

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;
use uuid::Uuid;

use auditchain::audit::hash_chain::{
    canonical_input, compute_entry_hash, truncate_to_millis, ChainHashInput, GENESIS_HASH,
};
use auditchain::audit::lock_key;

fn timestamp(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis).unwrap()
}

// ---------------------------------------------------------------------------
// lock_key::derive
// ---------------------------------------------------------------------------

proptest! {
    /// 同じテナントIDからは常に同じキー
    #[test]
    fn lock_key_is_deterministic(bytes in any::<[u8; 16]>()) {
        let tenant = Uuid::from_bytes(bytes);
        prop_assert_eq!(lock_key::derive(&tenant), lock_key::derive(&tenant));
    }

    /// 各半分は先頭16桁のhexを8桁ずつ読み、符号付きに再解釈した値
    #[test]
    fn lock_key_matches_hex_halves(bytes in any::<[u8; 16]>()) {
        let tenant = Uuid::from_bytes(bytes);
        let hex = tenant.simple().to_string();
        let hi = u32::from_str_radix(&hex[0..8], 16).unwrap() as i32;
        let lo = u32::from_str_radix(&hex[8..16], 16).unwrap() as i32;
        prop_assert_eq!(lock_key::derive(&tenant).as_pair(), (hi, lo));
    }

    /// 先頭が0x8以上（i64として読むと溢れる）IDでも安定
    #[test]
    fn lock_key_handles_high_bit_prefix(rest in any::<[u8; 15]>(), first in 0x80u8..=0xff) {
        let mut bytes = [0u8; 16];
        bytes[0] = first;
        bytes[1..].copy_from_slice(&rest);
        let tenant = Uuid::from_bytes(bytes);
        let key = lock_key::derive(&tenant);
        prop_assert!(key.as_pair().0 < 0);
        prop_assert_eq!(key, lock_key::derive(&tenant));
    }

    /// キーは先頭8バイトのみに依存する
    #[test]
    fn lock_key_ignores_trailing_bytes(head in any::<[u8; 8]>(), a in any::<[u8; 8]>(), b in any::<[u8; 8]>()) {
        let mut left = [0u8; 16];
        let mut right = [0u8; 16];
        left[..8].copy_from_slice(&head);
        right[..8].copy_from_slice(&head);
        left[8..].copy_from_slice(&a);
        right[8..].copy_from_slice(&b);
        prop_assert_eq!(
            lock_key::derive(&Uuid::from_bytes(left)),
            lock_key::derive(&Uuid::from_bytes(right))
        );
    }
}

// ---------------------------------------------------------------------------
// hash_chain::compute_entry_hash
// ---------------------------------------------------------------------------

proptest! {
    /// 同じ入力からは常に同じ64桁の小文字hex
    #[test]
    fn entry_hash_is_deterministic_lower_hex(
        seq in 1i64..1_000_000,
        action in "[a-z_]{1,12}\\.[a-z_]{1,12}",
        entity_type in "[a-z_]{1,12}",
        entity_id in proptest::option::of("[a-z0-9-]{1,16}"),
        millis in 0i64..4_102_444_800_000,
    ) {
        let tenant = Uuid::nil().to_string();
        let ts = timestamp(millis);
        let input = ChainHashInput {
            tenant_id: &tenant,
            sequence_number: seq,
            action: &action,
            entity_type: &entity_type,
            entity_id: entity_id.as_deref(),
            timestamp: &ts,
            previous_hash: None,
        };
        let first = compute_entry_hash(&input);
        prop_assert_eq!(&first, &compute_entry_hash(&input));
        prop_assert_eq!(first.len(), 64);
        prop_assert!(first.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    /// 欠落したentity_idは空文字、previous_hashはジェネシス値として扱われる
    #[test]
    fn missing_fields_are_canonicalized(seq in 1i64..1_000, millis in 0i64..4_102_444_800_000) {
        let tenant = Uuid::nil().to_string();
        let ts = timestamp(millis);
        let absent = ChainHashInput {
            tenant_id: &tenant,
            sequence_number: seq,
            action: "a.b",
            entity_type: "t",
            entity_id: None,
            timestamp: &ts,
            previous_hash: None,
        };
        let explicit = ChainHashInput {
            entity_id: Some(""),
            previous_hash: Some(GENESIS_HASH),
            ..absent
        };
        prop_assert_eq!(canonical_input(&absent), canonical_input(&explicit));
        prop_assert_eq!(compute_entry_hash(&absent), compute_entry_hash(&explicit));
    }

    /// 連番・アクション・前ハッシュのいずれが変わってもハッシュが変わる
    #[test]
    fn entry_hash_is_field_sensitive(
        seq in 1i64..1_000_000,
        action in "[a-z]{1,10}",
        prev in "[0-9a-f]{64}",
        millis in 0i64..4_102_444_800_000,
    ) {
        let tenant = Uuid::nil().to_string();
        let ts = timestamp(millis);
        let base = ChainHashInput {
            tenant_id: &tenant,
            sequence_number: seq,
            action: &action,
            entity_type: "part",
            entity_id: Some("p1"),
            timestamp: &ts,
            previous_hash: Some(&prev),
        };
        let hash = compute_entry_hash(&base);

        let bumped = ChainHashInput { sequence_number: seq + 1, ..base };
        prop_assert_ne!(&hash, &compute_entry_hash(&bumped));

        let renamed = format!("{}x", action);
        let altered = ChainHashInput { action: &renamed, ..base };
        prop_assert_ne!(&hash, &compute_entry_hash(&altered));

        let relinked = ChainHashInput { previous_hash: Some(GENESIS_HASH), ..base };
        prop_assert_ne!(&hash, &compute_entry_hash(&relinked));
    }

    /// ミリ秒未満の差はハッシュに影響しない
    #[test]
    fn sub_millisecond_precision_is_dropped(millis in 0i64..4_102_444_800_000, nanos in 0u32..1_000_000) {
        let tenant = Uuid::nil().to_string();
        let coarse = timestamp(millis);
        let fine = coarse + chrono::Duration::nanoseconds(nanos as i64);
        let truncated = truncate_to_millis(fine);
        prop_assert_eq!(truncated, coarse);

        let input = |ts: &DateTime<Utc>| {
            compute_entry_hash(&ChainHashInput {
                tenant_id: &tenant,
                sequence_number: 1,
                action: "a.b",
                entity_type: "t",
                entity_id: None,
                timestamp: ts,
                previous_hash: None,
            })
        };
        prop_assert_eq!(input(&coarse), input(&fine));
    }
}
