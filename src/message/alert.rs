use crate::codec::{Reader, Writer};
use crate::types::{AlertDescription, AlertLevel};
use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alert {
    pub level: AlertLevel,
    pub description: AlertDescription,
}

impl Alert {
    pub fn fatal(description: AlertDescription) -> Self {
        Alert {
            level: AlertLevel::Fatal,
            description,
        }
    }

    pub fn warning(description: AlertDescription) -> Self {
        Alert {
            level: AlertLevel::Warning,
            description,
        }
    }

    pub fn parse(r: &mut Reader<'_>) -> Result<Alert, Error> {
        let level = AlertLevel::from_u8(r.read_u8()?);
        let description = AlertDescription::from_u8(r.read_u8()?);
        r.expect_end("Alert")?;
        if let AlertLevel::Unknown(v) = level {
            return Err(Error::IllegalParameter(format!("alert level {}", v)));
        }
        Ok(Alert { level, description })
    }

    pub fn serialize(&self, w: &mut Writer<'_>) {
        w.put_u8(self.level.as_u8());
        w.put_u8(self.description.as_u8());
    }
}
