//! Moving in-flight bytes into a replacement buffer.

use spool_core::{PoolBuffer, PoolError};

/// Copy the `used` in-flight bytes at `old.pos()` to `new.pos()`.
///
/// The in-flight region is staged but uncommitted, so neither cursor
/// moves. Fails with [`PoolError::InvalidMigration`] if the region runs
/// past `old.end()`, if `new` has fewer than `used + requested` free bytes,
/// or if `old` and `new` are the same buffer. A zero-length copy succeeds
/// without touching either body.
///
/// The region is copied out of `old` before `new` is locked, so the two
/// body locks are never held together.
pub fn migrate_outstanding_writes<B: PoolBuffer>(
    old: &B,
    new: &B,
    used: usize,
    requested: usize,
) -> Result<(), PoolError> {
    let available = new.free_size();
    let invalid = PoolError::InvalidMigration {
        used,
        requested,
        available,
    };
    let src = old.pos();
    let fits_old = src >= old.start() && src.checked_add(used).is_some_and(|end| end <= old.end());
    let fits_new = used.checked_add(requested).is_some_and(|needed| needed <= available);
    if !fits_old || !fits_new || std::ptr::eq(old, new) {
        return Err(invalid);
    }
    if used == 0 {
        return Ok(());
    }
    let pending = old.with_body(|from| from[src..src + used].to_vec());
    let dst = new.pos();
    new.with_body_mut(|to| to[dst..dst + used].copy_from_slice(&pending));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use spool_core::EventBuffer;

    fn buffer(size: usize) -> EventBuffer {
        EventBuffer::initialize(EventBuffer::header_size(), size).unwrap()
    }

    #[test]
    fn copies_in_flight_region_to_new_pos() {
        let old = buffer(64);
        assert!(old.write(b"done"));
        assert!(old.stage(b"pending"));
        let new = buffer(128);
        assert!(new.write(b"xx"));

        migrate_outstanding_writes(&old, &new, 7, 10).unwrap();
        new.with_body(|body| assert_eq!(&body[2..9], b"pending"));
        assert_eq!(new.pos(), 2, "migration does not commit");
        assert_eq!(old.pos(), 4);
    }

    #[test]
    fn zero_length_is_a_no_op() {
        let old = buffer(64);
        let new = buffer(64);
        migrate_outstanding_writes(&old, &new, 0, 64).unwrap();
        new.with_body(|body| assert!(body.iter().all(|&b| b == 0)));
    }

    #[test]
    fn rejects_region_past_old_end() {
        let old = buffer(16);
        assert!(old.write(&[0u8; 10]));
        let new = buffer(64);
        let err = migrate_outstanding_writes(&old, &new, 7, 0).unwrap_err();
        assert_eq!(
            err,
            PoolError::InvalidMigration {
                used: 7,
                requested: 0,
                available: 64
            }
        );
    }

    #[test]
    fn rejects_undersized_replacement() {
        let old = buffer(64);
        let new = buffer(16);
        assert!(migrate_outstanding_writes(&old, &new, 8, 9).is_err());
        assert!(migrate_outstanding_writes(&old, &new, 8, 8).is_ok());
    }

    #[test]
    fn rejects_same_buffer() {
        let b = buffer(64);
        assert!(migrate_outstanding_writes(&b, &b, 1, 1).is_err());
    }

    #[test]
    fn opposite_migrations_do_not_deadlock() {
        let a = buffer(64);
        let b = buffer(64);
        assert!(a.stage(&[1u8; 8]));
        assert!(b.stage(&[2u8; 8]));

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for _ in 0..1000 {
                    migrate_outstanding_writes(&a, &b, 8, 0).unwrap();
                }
            });
            scope.spawn(|| {
                for _ in 0..1000 {
                    migrate_outstanding_writes(&b, &a, 8, 0).unwrap();
                }
            });
        });
        assert_eq!(a.pos(), 0);
        assert_eq!(b.pos(), 0);
    }

    #[cfg(not(miri))]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn migrated_bytes_match_source(
                committed in proptest::collection::vec(any::<u8>(), 0..32),
                pending in proptest::collection::vec(any::<u8>(), 0..32),
                requested in 0usize..32,
            ) {
                let old = buffer(64);
                prop_assert!(old.write(&committed));
                prop_assert!(old.stage(&pending));
                let new = buffer(64);

                migrate_outstanding_writes(&old, &new, pending.len(), requested).unwrap();
                new.with_body(|body| assert_eq!(&body[..pending.len()], &pending[..]));
            }
        }
    }
}
