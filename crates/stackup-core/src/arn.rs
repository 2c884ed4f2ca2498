//! Role ARN validation

use crate::error::ConfigError;

const IAM_ARN_PREFIX: &str = "arn:aws:iam:";
const MIN_ARN_SEGMENTS: usize = 6;

/// Return `arn` unchanged if it names an IAM resource, otherwise fail.
///
/// `arn:aws:iam::111111111111:role/name` passes; an EC2 ARN or anything
/// with fewer than six colon-separated segments does not.
pub fn validate_arn(arn: &str) -> Result<&str, ConfigError> {
    if arn.starts_with(IAM_ARN_PREFIX) && arn.split(':').count() >= MIN_ARN_SEGMENTS {
        Ok(arn)
    } else {
        Err(ConfigError::invalid_arn())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn returns_valid_arn() {
        let role_arn = "arn:aws:iam::111111111111:role/test";
        assert_eq!(validate_arn(role_arn), Ok(role_arn));
    }

    #[test]
    fn rejects_other_service() {
        let err = validate_arn("arn:aws:ec2::111111111111:instance/i-abc123").unwrap_err();
        assert!(err.to_string().contains("invalid arn format"));
    }

    #[test]
    fn rejects_too_few_segments() {
        assert!(validate_arn("arn:aws:iam::role").is_err());
        assert!(validate_arn("").is_err());
    }

    proptest! {
        #[test]
        fn identity_on_iam_arns(account in "[0-9]{12}", name in "[A-Za-z0-9+=,.@_-]{1,64}") {
            let arn = format!("arn:aws:iam::{account}:role/{name}");
            prop_assert_eq!(validate_arn(&arn), Ok(arn.as_str()));
        }

        #[test]
        fn rejects_non_iam_prefix(service in "[a-z0-9]{2,12}", rest in "[a-z0-9:/-]{0,40}") {
            prop_assume!(service != "iam");
            let arn = format!("arn:aws:{service}:{rest}");
            prop_assert!(validate_arn(&arn).is_err());
        }
    }
}
