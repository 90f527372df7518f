/// Datagram framer - group + body envelope for framed mode
///
/// Wire layout of one datagram:
///
/// ```text
/// +-----------+----------------------+------------------------+
/// | group_len | group (group_len B)  | body (remaining bytes) |
/// +-----------+----------------------+------------------------+
///     u8
/// ```
///
/// Encoding writes into a caller-owned, pre-allocated buffer and checks
/// every bound before touching it.
use crate::errors::FrameError;
use crate::{FRAME_HEADER_LEN, MAX_GROUP_LEN};

pub struct Framer;

impl Framer {
    /// Size of the datagram produced for a group/body pair
    pub fn encoded_len(group: &[u8], body: &[u8]) -> usize {
        FRAME_HEADER_LEN + group.len() + body.len()
    }

    /// Encode a group/body pair into `out`
    ///
    /// # Returns
    /// Number of bytes written, i.e. the datagram length
    ///
    /// # Errors
    /// - `GroupTooLong` if the group does not fit the length byte
    /// - `FrameTooLarge` if the datagram would not fit in `out`
    pub fn encode(group: &[u8], body: &[u8], out: &mut [u8]) -> Result<usize, FrameError> {
        if group.len() > MAX_GROUP_LEN {
            return Err(FrameError::GroupTooLong(group.len()));
        }

        let size = Self::encoded_len(group, body);
        if size > out.len() {
            return Err(FrameError::FrameTooLarge {
                required: size,
                available: out.len(),
            });
        }

        let body_offset = FRAME_HEADER_LEN + group.len();
        out[0] = group.len() as u8;
        out[FRAME_HEADER_LEN..body_offset].copy_from_slice(group);
        out[body_offset..size].copy_from_slice(body);

        Ok(size)
    }

    /// Split a received datagram into its group and body segments
    ///
    /// The body may be empty. A datagram shorter than its declared group
    /// (including an empty datagram) is `Truncated`.
    pub fn decode(datagram: &[u8]) -> Result<(&[u8], &[u8]), FrameError> {
        let Some((&declared, rest)) = datagram.split_first() else {
            return Err(FrameError::Truncated {
                declared: 0,
                available: 0,
            });
        };

        let declared = declared as usize;
        if rest.len() < declared {
            return Err(FrameError::Truncated {
                declared,
                available: rest.len(),
            });
        }

        Ok(rest.split_at(declared))
    }
}
