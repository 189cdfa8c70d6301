use super::*;

#[derive(Debug, Clone, PartialEq)]
pub struct Submit {
    pub username: Username,
    pub job_id: JobId,
    pub extranonce2: Extranonce,
    pub ntime: Ntime,
    pub nonce: Nonce,
}

impl Serialize for Submit {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(5))?;
        seq.serialize_element(&self.username)?;
        seq.serialize_element(&self.job_id)?;
        seq.serialize_element(&self.extranonce2)?;
        seq.serialize_element(&self.ntime)?;
        seq.serialize_element(&self.nonce)?;
        seq.end()
    }
}

impl<'de> Deserialize<'de> for Submit {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (username, job_id, extranonce2, ntime, nonce) =
            <(Username, JobId, Extranonce, Ntime, Nonce)>::deserialize(deserializer)?;

        Ok(Submit {
            username,
            job_id,
            extranonce2,
            ntime,
            nonce,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let json = r#"["Dabc.rig1","bf","00000001","504e86ed","b2957c02"]"#;
        let submit: Submit = serde_json::from_str(json).unwrap();

        assert_eq!(submit.username, "Dabc.rig1".into());
        assert_eq!(submit.job_id, "bf".parse().unwrap());
        assert_eq!(submit.extranonce2.to_hex(), "00000001");
        assert_eq!(u32::from(submit.ntime), 0x504e86ed);
        assert_eq!(u32::from(submit.nonce), 0xb2957c02);

        let reserialized = serde_json::to_string(&submit).unwrap();
        assert_eq!(
            serde_json::from_str::<Value>(json).unwrap(),
            serde_json::from_str::<Value>(&reserialized).unwrap(),
        );
    }

    #[test]
    fn rejects_bad_arity() {
        assert!(serde_json::from_str::<Submit>(r#"["u","bf","00000001","504e86ed"]"#).is_err());
        assert!(serde_json::from_str::<Submit>(r#"[]"#).is_err());
    }

    #[test]
    fn rejects_malformed_fields() {
        assert!(
            serde_json::from_str::<Submit>(r#"["u","bf","zz","504e86ed","b2957c02"]"#).is_err()
        );
        assert!(
            serde_json::from_str::<Submit>(r#"["u","bf","00000001","504e86ed","nope"]"#).is_err()
        );
    }
}
