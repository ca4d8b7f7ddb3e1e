//! Signing with apksigner and the public keystore.

use super::{BuildContext, SignedArtifact};
use crate::error::{Result, SignError};
use crate::tools::{Invocation, OutputMode, labels, run_checked};
use crate::utils::fs;
use std::path::{Path, PathBuf};

/// Keystore identity passed to apksigner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningIdentity {
    /// Keystore file
    pub keystore: PathBuf,
    /// Key alias inside the keystore
    pub alias: String,
    /// Keystore password
    pub store_password: String,
    /// Key password
    pub key_password: String,
}

impl Default for SigningIdentity {
    fn default() -> Self {
        Self {
            keystore: PathBuf::from("keystore/public.jks"),
            alias: "public".to_string(),
            store_password: "public".to_string(),
            key_password: "public".to_string(),
        }
    }
}

impl SigningIdentity {
    /// Default identity with a different keystore file
    pub fn with_keystore(keystore: impl Into<PathBuf>) -> Self {
        Self {
            keystore: keystore.into(),
            ..Self::default()
        }
    }
}

/// File name of the signed package
pub fn signed_file_name(app: &str, name: &str, version: &str) -> String {
    format!("{app}-{name}-v{version}.apk")
}

fn sign_invocation(signer: &Path, identity: &SigningIdentity, unsigned: &Path, signed: &Path) -> Invocation {
    Invocation::new(labels::SIGN, signer)
        .arg("sign")
        .arg("--verbose")
        .arg("--ks")
        .arg(&identity.keystore)
        .arg("--ks-pass")
        .arg(format!("pass:{}", identity.store_password))
        .arg("--key-pass")
        .arg(format!("pass:{}", identity.key_password))
        .arg("--ks-key-alias")
        .arg(&identity.alias)
        .arg("--in")
        .arg(unsigned)
        .arg("--out")
        .arg(signed)
        .mode(OutputMode::Stream)
}

/// Sign `unsigned`, remove it, and return the signed package
pub async fn sign(
    ctx: &BuildContext<'_>,
    app: &str,
    unsigned: &Path,
    version: &str,
    name: &str,
) -> Result<SignedArtifact> {
    let signed = ctx
        .settings
        .work_dir
        .join(signed_file_name(app, name, version));
    // Signing in place and then deleting the input would lose the package
    if signed == unsigned {
        return Err(SignError::OutputCollides { path: signed }.into());
    }

    let signer = ctx
        .signing_tool
        .locate()
        .await?
        .ok_or(SignError::ToolUnavailable)?;

    ctx.output.progress(&format!("Signing {}", unsigned.display()));
    let invocation = sign_invocation(&signer, &ctx.settings.signing, unsigned, &signed);
    run_checked(ctx.runner, &invocation).await?;

    if !fs::is_file(&signed).await {
        return Err(SignError::SignedArtifactMissing { path: signed }.into());
    }

    fs::remove_file(unsigned).await?;
    ctx.output.success(&format!("Signed {}", signed.display()));

    Ok(SignedArtifact {
        path: signed,
        version: version.to_string(),
        name: name.to_string(),
    })
}
