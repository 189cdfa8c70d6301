use super::*;

#[derive(Debug, PartialEq)]
pub struct Authorize {
    pub username: Username,
    pub password: Option<String>,
}

impl Serialize for Authorize {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let len = if self.password.is_some() { 2 } else { 1 };
        let mut seq = serializer.serialize_seq(Some(len))?;
        seq.serialize_element(&self.username)?;
        if let Some(password) = &self.password {
            seq.serialize_element(password)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for Authorize {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            One((Username,)),
            Two((Username, Option<String>)),
        }

        match Raw::deserialize(deserializer)? {
            Raw::One((username,)) => Ok(Authorize {
                username,
                password: None,
            }),
            Raw::Two((username, password)) => Ok(Authorize { username, password }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_password() {
        let authorize: Authorize =
            serde_json::from_str(r#"["Dabc.rig1","password"]"#).unwrap();
        assert_eq!(authorize.username, "Dabc.rig1".into());
        assert_eq!(authorize.password.as_deref(), Some("password"));
    }

    #[test]
    fn password_omitted_or_null() {
        let authorize: Authorize = serde_json::from_str(r#"["Dabc.rig1"]"#).unwrap();
        assert!(authorize.password.is_none());

        let authorize: Authorize = serde_json::from_str(r#"["Dabc.rig1",null]"#).unwrap();
        assert!(authorize.password.is_none());
        assert_eq!(
            serde_json::to_value(&authorize).unwrap(),
            json!(["Dabc.rig1"])
        );
    }

    #[test]
    fn rejects_bad_arity() {
        assert!(serde_json::from_str::<Authorize>("[]").is_err());
        assert!(serde_json::from_str::<Authorize>(r#"["u","p","extra"]"#).is_err());
    }
}
