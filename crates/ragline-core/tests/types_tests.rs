use ragline_core::types::{BackendSlot, RetrievalResult, Segment};

fn seg(id: u64, text: &str, distance: f32) -> Segment { Segment { id, text: text.to_string(), distance: Some(distance) } }

#[test]
fn duplicate_ids_at_equal_distance_order_by_text() {
    let forward = vec![seg(4, "zeta", 0.2), seg(4, "alpha", 0.2), seg(1, "mid", 0.2), seg(0, "far", 0.9)];
    let mut backward = forward.clone();
    backward.reverse();

    let a = RetrievalResult::from_unsorted(forward, 10);
    let b = RetrievalResult::from_unsorted(backward, 10);
    assert_eq!(a, b);
    assert_eq!(a.texts(), vec!["mid", "alpha", "zeta", "far"]);
}

#[test]
fn truncation_keeps_closest() {
    let result = RetrievalResult::from_unsorted(vec![seg(2, "b", 0.3), seg(1, "a", 0.1), seg(3, "c", 0.2)], 2);
    assert_eq!(result.texts(), vec!["a", "c"]);
}

#[test]
fn backend_slot_parses_case_insensitively() {
    assert_eq!("primary".parse::<BackendSlot>(), Ok(BackendSlot::Primary));
    assert_eq!(" Fallback ".parse::<BackendSlot>(), Ok(BackendSlot::Fallback));
    assert!("secondary".parse::<BackendSlot>().is_err());
    assert_eq!(BackendSlot::Fallback.to_string().parse::<BackendSlot>(), Ok(BackendSlot::Fallback));
}
