//! Per-suite message protection.
//!
//! A [`MessagePipeline`] is chosen once per channel from the suite id and
//! then used for every message. Both families derive their keys the same way:
//!
//! ```text
//! Kdf<I, O>(master, salt) ─ IV = sequence ─┬─ MAC_LABEL → mac_key
//!                                          └─ CTR_LABEL → enc_key  (CTR only)
//! ```
//!
//! The no-confidentiality family tags the plaintext. The CTR family encrypts
//! first and tags the ciphertext. The tag is always Kuznyechik-CMAC under the
//! derived MAC key, and the integrity field is `salt || tag`.

use std::marker::PhantomData;

use crisp_crypto::{
    HmacStreebog256, HmacStreebog512, Kdf, KdfInfo, KuznyechikCmac, MacAlgorithm, Nmac256, Salt,
    SecretKey, SimpleMac, apply_keystream, sequence_iv, tags_equal,
};
use crisp_proto::{Confidentiality, InnerStage, OuterStage, SuiteId, TAG_SIZE};

use crate::{ChannelError, UserTag};

/// KDF application label for the message MAC key.
pub const MAC_LABEL: &[u8; 32] = b"CRISP messenger MAC key derivatn";

/// KDF application label for the CTR encryption key.
pub const CTR_LABEL: &[u8; 32] = b"CRISP messenger CTR key derivatn";

const ADDITIONAL_INFO: [u8; 16] = [0u8; 16];

/// Authentication tag carried after the salt.
pub type Tag = [u8; TAG_SIZE];

/// Seals outgoing payloads and opens incoming ones for one suite.
pub trait MessagePipeline: Send + Sync {
    /// Protect `payload` in place and return its tag.
    ///
    /// # Errors
    ///
    /// - `ChannelError::Crypto` if key derivation fails
    fn seal(&self, sequence: u64, salt: &Salt, payload: &mut [u8]) -> Result<Tag, ChannelError>;

    /// Verify `tag` over `payload` and undo the protection in place.
    ///
    /// Nothing is decrypted unless the tag matches.
    ///
    /// # Errors
    ///
    /// - `ChannelError::IntegrityFailure` if the tag does not match
    /// - `ChannelError::Crypto` if key derivation fails
    fn open(
        &self,
        sequence: u64,
        salt: &Salt,
        tag: &[u8],
        payload: &mut [u8],
    ) -> Result<(), ChannelError>;
}

/// Key material shared by both pipeline families.
struct Keys {
    master: SecretKey,
    local_user: UserTag,
    remote_user: UserTag,
}

impl Keys {
    fn kdf<I: MacAlgorithm, O: MacAlgorithm>(&self, salt: &Salt) -> Result<Kdf<I, O>, ChannelError> {
        Ok(Kdf::new(&self.master, salt)?)
    }
}

fn derive<I: MacAlgorithm, O: MacAlgorithm>(
    kdf: &mut Kdf<I, O>,
    sequence: u64,
    user: &UserTag,
    label: &[u8; 32],
) -> Result<SecretKey, ChannelError> {
    let iv = sequence_iv(sequence, kdf.digest_size());
    let info = KdfInfo { application: label, user, additional: &ADDITIONAL_INFO };
    Ok(kdf.derive_key(&iv, &info)?)
}

fn tag(mac_key: &SecretKey, data: &[u8]) -> Result<Tag, ChannelError> {
    let digest = KuznyechikCmac::compute(mac_key.as_bytes(), data)?;
    let mut tag = [0u8; TAG_SIZE];
    tag.copy_from_slice(&digest[..TAG_SIZE]);
    Ok(tag)
}

fn verify(mac_key: &SecretKey, sequence: u64, data: &[u8], received: &[u8]) -> Result<(), ChannelError> {
    let expected = tag(mac_key, data)?;
    if tags_equal(&expected, received) {
        Ok(())
    } else {
        Err(ChannelError::IntegrityFailure { sequence })
    }
}

/// Authentication without confidentiality.
struct MacOnlyPipeline<I, O> {
    keys: Keys,
    _stages: PhantomData<fn() -> (I, O)>,
}

impl<I: MacAlgorithm, O: MacAlgorithm> MessagePipeline for MacOnlyPipeline<I, O> {
    fn seal(&self, sequence: u64, salt: &Salt, payload: &mut [u8]) -> Result<Tag, ChannelError> {
        let mut kdf = self.keys.kdf::<I, O>(salt)?;
        let mac_key = derive(&mut kdf, sequence, &self.keys.local_user, MAC_LABEL)?;
        tag(&mac_key, payload)
    }

    fn open(
        &self,
        sequence: u64,
        salt: &Salt,
        tag: &[u8],
        payload: &mut [u8],
    ) -> Result<(), ChannelError> {
        let mut kdf = self.keys.kdf::<I, O>(salt)?;
        let mac_key = derive(&mut kdf, sequence, &self.keys.remote_user, MAC_LABEL)?;
        verify(&mac_key, sequence, payload, tag)
    }
}

/// Kuznyechik-CTR encryption followed by a tag over the ciphertext.
struct CtrPipeline<I, O> {
    keys: Keys,
    _stages: PhantomData<fn() -> (I, O)>,
}

impl<I: MacAlgorithm, O: MacAlgorithm> MessagePipeline for CtrPipeline<I, O> {
    fn seal(&self, sequence: u64, salt: &Salt, payload: &mut [u8]) -> Result<Tag, ChannelError> {
        let mut kdf = self.keys.kdf::<I, O>(salt)?;
        let mac_key = derive(&mut kdf, sequence, &self.keys.local_user, MAC_LABEL)?;
        let enc_key = derive(&mut kdf, sequence, &self.keys.local_user, CTR_LABEL)?;

        apply_keystream(&enc_key, sequence, payload);
        tag(&mac_key, payload)
    }

    fn open(
        &self,
        sequence: u64,
        salt: &Salt,
        tag: &[u8],
        payload: &mut [u8],
    ) -> Result<(), ChannelError> {
        let mut kdf = self.keys.kdf::<I, O>(salt)?;
        let mac_key = derive(&mut kdf, sequence, &self.keys.remote_user, MAC_LABEL)?;
        verify(&mac_key, sequence, payload, tag)?;

        let enc_key = derive(&mut kdf, sequence, &self.keys.remote_user, CTR_LABEL)?;
        apply_keystream(&enc_key, sequence, payload);
        Ok(())
    }
}

fn with_confidentiality<I, O>(confidentiality: Confidentiality, keys: Keys) -> Box<dyn MessagePipeline>
where
    I: MacAlgorithm + 'static,
    O: MacAlgorithm + 'static,
{
    match confidentiality {
        Confidentiality::None => Box::new(MacOnlyPipeline::<I, O> { keys, _stages: PhantomData }),
        Confidentiality::KuznyechikCtr => {
            Box::new(CtrPipeline::<I, O> { keys, _stages: PhantomData })
        },
    }
}

/// Build the pipeline for `suite`.
///
/// Outgoing messages are keyed with `local_user`, incoming ones with
/// `remote_user`.
pub fn pipeline_for(
    suite: SuiteId,
    master: SecretKey,
    local_user: UserTag,
    remote_user: UserTag,
) -> Box<dyn MessagePipeline> {
    use InnerStage as In;
    use OuterStage as Out;

    let keys = Keys { master, local_user, remote_user };
    let conf = suite.confidentiality();
    match (suite.inner_stage(), suite.outer_stage()) {
        (In::Nmac, Out::Nmac) => with_confidentiality::<Nmac256, Nmac256>(conf, keys),
        (In::Nmac, Out::Hmac256) => with_confidentiality::<Nmac256, HmacStreebog256>(conf, keys),
        (In::Nmac, Out::Hmac512) => with_confidentiality::<Nmac256, HmacStreebog512>(conf, keys),
        (In::Nmac, Out::Cmac) => with_confidentiality::<Nmac256, KuznyechikCmac>(conf, keys),
        (In::Hmac, Out::Nmac) => with_confidentiality::<HmacStreebog512, Nmac256>(conf, keys),
        (In::Hmac, Out::Hmac256) => {
            with_confidentiality::<HmacStreebog512, HmacStreebog256>(conf, keys)
        },
        (In::Hmac, Out::Hmac512) => {
            with_confidentiality::<HmacStreebog512, HmacStreebog512>(conf, keys)
        },
        (In::Hmac, Out::Cmac) => with_confidentiality::<HmacStreebog512, KuznyechikCmac>(conf, keys),
        (In::Simple, Out::Nmac) => with_confidentiality::<SimpleMac, Nmac256>(conf, keys),
        (In::Simple, Out::Hmac256) => with_confidentiality::<SimpleMac, HmacStreebog256>(conf, keys),
        (In::Simple, Out::Hmac512) => with_confidentiality::<SimpleMac, HmacStreebog512>(conf, keys),
        (In::Simple, Out::Cmac) => with_confidentiality::<SimpleMac, KuznyechikCmac>(conf, keys),
    }
}
