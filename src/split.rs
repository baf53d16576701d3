use tracing::trace;

use crate::page::Page;
use crate::page_builder::append_range;
use crate::page_layout::{HEADER_SIZE, OFFSET_SIZE, PTR_SIZE};

/// Splits `src` into `left` and `right`, keeping key order. `right` receives
/// as many trailing entries as fit in one page, `left` receives the rest and
/// may still exceed `page_size`.
pub fn split_in_two(left: &mut Page, right: &mut Page, src: &Page, page_size: usize) {
    let nkeys = src.key_count();
    assert!(nkeys >= 2, "cannot split a page of {} keys", nkeys);
    assert!(
        src.used_bytes() <= 2 * page_size,
        "page of {} bytes is too large to split",
        src.used_bytes()
    );

    let entry_bytes =
        |idx: usize| PTR_SIZE + OFFSET_SIZE + src.offset(idx + 1) - src.offset(idx);

    // Grow the right half from the end while it fits, leaving at least one
    // entry on the left.
    let mut split_at = nkeys - 1;
    let mut right_bytes = HEADER_SIZE + entry_bytes(split_at);
    while split_at > 1 && right_bytes + entry_bytes(split_at - 1) <= page_size {
        split_at -= 1;
        right_bytes += entry_bytes(split_at);
    }

    let node_type = src.node_type();
    left.set_header(node_type, split_at);
    append_range(left, src, 0, 0, split_at);
    right.set_header(node_type, nkeys - split_at);
    append_range(right, src, 0, split_at, nkeys - split_at);
}

/// Splits an oversized page into at most three pages, each within
/// `page_size`, in key order. A page that already fits is returned alone.
pub fn split_to_at_most_three(src: Page, page_size: usize) -> Vec<Page> {
    if src.used_bytes() <= page_size {
        return vec![src.truncate(page_size)];
    }

    let mut left = Page::new(2 * page_size);
    let mut right = Page::new(page_size);
    split_in_two(&mut left, &mut right, &src, page_size);
    if left.used_bytes() <= page_size {
        trace!(
            keys = src.key_count(),
            bytes = src.used_bytes(),
            "split page in two"
        );
        return vec![left.truncate(page_size), right];
    }

    let mut leftleft = Page::new(2 * page_size);
    let mut middle = Page::new(page_size);
    split_in_two(&mut leftleft, &mut middle, &left, page_size);
    trace!(
        keys = src.key_count(),
        bytes = src.used_bytes(),
        "split page in three"
    );
    vec![leftleft.truncate(page_size), middle, right]
}
