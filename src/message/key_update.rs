use crate::codec::{Reader, Writer};
use crate::Error;

/// KeyUpdate (RFC 8446 Section 4.6.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyUpdate {
    /// The sender asks the receiver to update its own sending keys too.
    pub update_requested: bool,
}

impl KeyUpdate {
    pub fn parse(r: &mut Reader<'_>) -> Result<KeyUpdate, Error> {
        let update_requested = match r.read_u8()? {
            0 => false,
            1 => true,
            v => {
                return Err(Error::IllegalParameter(format!(
                    "KeyUpdateRequest {}",
                    v
                )))
            }
        };
        r.expect_end("KeyUpdate")?;
        Ok(KeyUpdate { update_requested })
    }

    pub fn serialize(&self, w: &mut Writer<'_>) {
        w.put_u8(self.update_requested as u8);
    }
}
