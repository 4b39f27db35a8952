pub fn serialize<S>(this: &semver::VersionReq, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&this.to_string())
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<semver::VersionReq, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let requirement = <String as serde::Deserialize>::deserialize(deserializer)?;
    <semver::VersionReq as std::str::FromStr>::from_str(&requirement)
        .map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    #[derive(Debug, serde::Serialize, serde::Deserialize)]
    struct S {
        #[serde(
            serialize_with = "crate::parser::semver::serialize",
            deserialize_with = "crate::parser::semver::deserialize"
        )]
        v: semver::VersionReq,
    }

    #[test]
    fn basic() {
        let parsed = serde_json::from_str::<S>(r#"{"v": ">=1.0.0, <2.0.0"}"#).unwrap();
        assert_eq!(parsed.v, ">=1.0.0, <2.0.0".parse().unwrap());
    }

    #[test]
    fn invalid() {
        serde_json::from_str::<S>(r#"{"v": "not a requirement"}"#).unwrap_err();
    }
}
