use agora_persist::{assemble, Pagination};

#[test]
fn test_total_pages_and_has_next_hold_for_all_windows() {
    for total in 0u64..=60 {
        for page_size in 1u32..=12 {
            for page in 1u32..=8 {
                let pagination = Pagination::compute(total, page, page_size);
                let size = u64::from(page_size);

                let expected_pages = (total + size - 1) / size;
                let expected_next = u64::from(page - 1) * size + size < total;

                assert_eq!(pagination.total_pages, expected_pages, "total={total} size={page_size}");
                assert_eq!(pagination.has_next, expected_next, "total={total} page={page} size={page_size}");
            }
        }
    }
}

#[test]
fn test_has_next_is_false_on_exact_boundary() {
    let pagination = Pagination::compute(20, 2, 10);

    assert_eq!(pagination.total_pages, 2);
    assert!(!pagination.has_next);
}

#[test]
fn test_zero_page_size_has_no_pages() {
    let pagination = Pagination::compute(42, 1, 0);

    assert_eq!(pagination.total_pages, 0);
    assert!(!pagination.has_next);
}

#[test]
fn test_assemble_keeps_rows() {
    let page = assemble(vec!["a", "b"], 5, 1, 2);

    assert_eq!(page.items, vec!["a", "b"]);
    assert_eq!(page.pagination.total, 5);
    assert_eq!(page.pagination.total_pages, 3);
    assert!(page.pagination.has_next);

    let lengths = page.map(str::len);
    assert_eq!(lengths.items, vec![1, 1]);
}

#[test]
fn test_pagination_serializes() {
    let json = serde_json::to_value(Pagination::compute(11, 1, 10)).unwrap();

    assert_eq!(json["total"], 11);
    assert_eq!(json["total_pages"], 2);
    assert_eq!(json["has_next"], true);
}
