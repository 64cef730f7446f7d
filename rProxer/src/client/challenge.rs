//! Anti-bot challenge answering.

use async_trait::async_trait;
use url::Url;

use crate::error::Result;

/// Path answers to a challenge are posted to, relative to the site root.
pub const CHALLENGE_ANSWER_PATH: &str = "/cdn-cgi/l/chk_jschl";

/// Answers the interstitial page served with a 503.
#[async_trait]
pub trait ChallengeSolver: Send + Sync {
    /// Compute the answer for `page`, served for `url`.
    ///
    /// The returned string is used verbatim as the query of the answer request.
    async fn solve(&self, page: &str, url: &Url) -> Result<String>;
}

/// URL the answer `token` for a challenge on `url` is posted to.
pub fn answer_url(url: &Url, token: &str) -> Result<Url> {
    let mut answer = url.join(CHALLENGE_ANSWER_PATH)?;
    answer.set_query(Some(token));
    Ok(answer)
}
