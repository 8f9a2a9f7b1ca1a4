//! Stream identifiers and their per-role generator.

use derive_more::{Display, Into};
use serde::{Deserialize, Serialize};

use crate::error::{Error, IllegalArgument};

/// 31-bit stream identifier. `0` addresses the connection itself.
///
/// # Examples
///
/// ```
/// use rsocket_core::StreamId;
///
/// let id = StreamId::new(5).expect("31-bit id");
/// assert_eq!(id.get(), 5);
/// assert!(StreamId::new(0x8000_0000).is_err());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Into)]
#[display("{_0}")]
pub struct StreamId(u32);

impl StreamId {
    /// The connection-level stream.
    pub const CONNECTION: Self = Self(0);

    /// Largest legal stream id.
    pub const MAX: Self = Self(0x7FFF_FFFF);

    /// Validate a raw id.
    ///
    /// # Errors
    ///
    /// Returns [`IllegalArgument::StreamIdOutOfRange`] when the reserved top
    /// bit is set.
    pub const fn new(value: u32) -> Result<Self, IllegalArgument> {
        if value > Self::MAX.0 {
            Err(IllegalArgument::StreamIdOutOfRange { value })
        } else {
            Ok(Self(value))
        }
    }

    /// Wrap a value already known to fit 31 bits.
    pub(crate) const fn new_unchecked(value: u32) -> Self { Self(value & Self::MAX.0) }

    /// Raw id.
    #[must_use]
    pub const fn get(self) -> u32 { self.0 }

    /// Whether this is stream 0.
    #[must_use]
    pub const fn is_connection(self) -> bool { self.0 == 0 }
}

impl TryFrom<u32> for StreamId {
    type Error = IllegalArgument;

    fn try_from(value: u32) -> Result<Self, Self::Error> { Self::new(value) }
}

/// Which side of the connection this endpoint plays.
///
/// Clients originate odd stream ids, servers even ones, so the two peers
/// never collide on ids they allocate themselves.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Connection initiator; allocates 1, 3, 5, ...
    #[default]
    Client,
    /// Connection acceptor; allocates 2, 4, 6, ...
    Server,
}

impl Role {
    /// First id this role allocates.
    #[must_use]
    pub const fn first_stream_id(self) -> u32 {
        match self {
            Self::Client => 1,
            Self::Server => 2,
        }
    }

    /// Whether `id` has the parity this role allocates.
    #[must_use]
    pub const fn originates(self, id: StreamId) -> bool {
        !id.is_connection() && id.get() % 2 == self.first_stream_id() % 2
    }
}

/// Generator of candidate stream ids for one role.
///
/// A 64-bit counter advances by two and is masked to 31 bits, so ids wrap
/// inside the legal range. Zero is never returned.
#[derive(Clone, Debug)]
pub struct StreamIdSupplier {
    role: Role,
    next_raw: u64,
    mask: u32,
}

impl StreamIdSupplier {
    /// Supplier for `role`.
    #[must_use]
    pub const fn new(role: Role) -> Self {
        Self {
            role,
            next_raw: role.first_stream_id() as u64,
            mask: StreamId::MAX.0,
        }
    }

    /// Role whose ids this supplier hands out.
    #[must_use]
    pub const fn role(&self) -> Role { self.role }

    /// Supplier of odd ids.
    #[must_use]
    pub const fn client() -> Self { Self::new(Role::Client) }

    /// Supplier of even ids.
    #[must_use]
    pub const fn server() -> Self { Self::new(Role::Server) }

    /// Supplier whose ids wrap at `mask`, for exercising exhaustion and
    /// wrap-around without billions of allocations.
    ///
    /// `mask` must be one less than a power of two and at most
    /// [`StreamId::MAX`].
    #[cfg(any(test, feature = "advanced-tests"))]
    #[must_use]
    pub const fn with_mask_for_tests(role: Role, mask: u32) -> Self {
        Self {
            role,
            next_raw: role.first_stream_id() as u64,
            mask: mask & StreamId::MAX.0,
        }
    }

    /// Return the next id for which `is_occupied` is false.
    ///
    /// Occupied ids and zero are skipped. Probing stops after one full cycle
    /// of the id space.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RegistryExhausted`] when every id of this role is
    /// occupied.
    ///
    /// # Examples
    ///
    /// ```
    /// use rsocket_core::StreamIdSupplier;
    ///
    /// let mut supplier = StreamIdSupplier::client();
    /// let first = supplier.next_stream_id(|_| false).expect("free id");
    /// let second = supplier.next_stream_id(|id| id.get() == 3).expect("free id");
    /// assert_eq!((first.get(), second.get()), (1, 5));
    /// ```
    pub fn next_stream_id(
        &mut self,
        mut is_occupied: impl FnMut(StreamId) -> bool,
    ) -> Result<StreamId, Error> {
        let mask = u64::from(self.mask);
        let attempts = mask.div_ceil(2) + 1;
        for _ in 0..attempts {
            let raw = self.next_raw & mask;
            self.next_raw = self.next_raw.wrapping_add(2);
            let Ok(raw) = u32::try_from(raw) else {
                continue;
            };
            if raw == 0 {
                continue;
            }
            let id = StreamId(raw);
            if !is_occupied(id) {
                return Ok(id);
            }
        }
        Err(Error::RegistryExhausted)
    }

    /// Whether `id` is at or below the last id this supplier handed out.
    ///
    /// Late frames for such ids belong to streams that have since ended.
    /// Before the first allocation nothing qualifies.
    #[must_use]
    pub fn is_before_or_current(&self, id: StreamId) -> bool {
        !id.is_connection()
            && self
                .next_raw
                .checked_sub(2)
                .is_some_and(|last| u64::from(id.get()) <= last)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::client(Role::Client, [1, 3, 5, 7])]
    #[case::server(Role::Server, [2, 4, 6, 8])]
    fn suppliers_step_by_two(#[case] role: Role, #[case] expected: [u32; 4]) {
        let mut supplier = StreamIdSupplier::new(role);
        let ids: Vec<u32> = (0..4)
            .map(|_| supplier.next_stream_id(|_| false).expect("id").get())
            .collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn server_wraps_past_zero() {
        let mut supplier = StreamIdSupplier::with_mask_for_tests(Role::Server, 0x7);
        let ids: Vec<u32> = (0..5)
            .map(|_| supplier.next_stream_id(|_| false).expect("id").get())
            .collect();
        assert_eq!(ids, [2, 4, 6, 2, 4]);
    }

    #[test]
    fn client_wraps_within_odd_ids() {
        let mut supplier = StreamIdSupplier::with_mask_for_tests(Role::Client, 0x7);
        let ids: Vec<u32> = (0..6)
            .map(|_| supplier.next_stream_id(|_| false).expect("id").get())
            .collect();
        assert_eq!(ids, [1, 3, 5, 7, 1, 3]);
    }

    #[test]
    fn full_size_client_wraps_to_one() {
        let mut supplier = StreamIdSupplier::client();
        supplier.next_raw = u64::from(StreamId::MAX.get());
        let last = supplier.next_stream_id(|_| false).expect("id");
        let wrapped = supplier.next_stream_id(|_| false).expect("id");
        assert_eq!(last, StreamId::MAX);
        assert_eq!(wrapped.get(), 1);
    }

    #[test]
    fn occupied_ids_are_skipped() {
        let mut supplier = StreamIdSupplier::with_mask_for_tests(Role::Client, 0xF);
        let occupied: HashSet<u32> = [1, 3, 7].into_iter().collect();
        let id = supplier
            .next_stream_id(|id| occupied.contains(&id.get()))
            .expect("id");
        assert_eq!(id.get(), 5);
        let id = supplier
            .next_stream_id(|id| occupied.contains(&id.get()))
            .expect("id");
        assert_eq!(id.get(), 9);
    }

    #[rstest]
    #[case::client(Role::Client)]
    #[case::server(Role::Server)]
    fn exhaustion_is_reported(#[case] role: Role) {
        let mut supplier = StreamIdSupplier::with_mask_for_tests(role, 0xF);
        assert_eq!(
            supplier.next_stream_id(|_| true),
            Err(Error::RegistryExhausted)
        );
    }

    #[test]
    fn is_before_or_current_tracks_handed_out_ids() {
        let mut supplier = StreamIdSupplier::client();
        assert!(!supplier.is_before_or_current(StreamId(1)));
        let id = supplier.next_stream_id(|_| false).expect("id");
        assert!(supplier.is_before_or_current(id));
        assert!(!supplier.is_before_or_current(StreamId(2)));
        assert!(!supplier.is_before_or_current(StreamId(5)));
        assert!(!supplier.is_before_or_current(StreamId::CONNECTION));
    }

    #[rstest]
    #[case::client(Role::Client, 1, [1], [2, 3])]
    #[case::server(Role::Server, 2, [1, 2], [3, 4])]
    fn is_before_or_current_stops_at_last_issued<const N: usize>(
        #[case] role: Role,
        #[case] issued: u32,
        #[case] before: [u32; N],
        #[case] after: [u32; 2],
    ) {
        let mut supplier = StreamIdSupplier::new(role);
        assert_eq!(supplier.next_stream_id(|_| false).map(StreamId::get), Ok(issued));
        for raw in before {
            assert!(supplier.is_before_or_current(StreamId(raw)), "{raw} was issued");
        }
        for raw in after {
            assert!(!supplier.is_before_or_current(StreamId(raw)), "{raw} not yet issued");
        }
    }

    #[test]
    fn server_has_issued_nothing_before_first_allocation() {
        let supplier = StreamIdSupplier::server();
        assert_eq!(supplier.role(), Role::Server);
        assert!(!supplier.is_before_or_current(StreamId(1)));
        assert!(!supplier.is_before_or_current(StreamId(2)));
    }

    #[test]
    fn stream_id_rejects_reserved_bit() {
        assert_eq!(
            StreamId::new(0x8000_0000),
            Err(IllegalArgument::StreamIdOutOfRange { value: 0x8000_0000 })
        );
        assert_eq!(StreamId::try_from(0x7FFF_FFFF), Ok(StreamId::MAX));
    }

    #[test]
    fn roles_own_disjoint_parities() {
        assert!(Role::Client.originates(StreamId(3)));
        assert!(!Role::Client.originates(StreamId(4)));
        assert!(Role::Server.originates(StreamId(4)));
        assert!(!Role::Server.originates(StreamId::CONNECTION));
    }
}
