//! User-facing texts. Command replies are MarkdownV2.

pub const WELCOME: &str = "***Welcome to Cobalt Fox\\!***\nCobalt Fox allows you to download videos from YouTube, Facebook, Instagram, Twitter, and many more platforms\\. Just send me a link to the video you want to download and I will take care of the rest\\.\n\nIf you want to know about additional options, type /help\\.";

pub const HELP: &str = "Just send me a link of the medium you want to download and I will take care of the rest\\. You can append some \"option flags\" if you want to customize the download\\. You don't have to specify flags, in that case I will decide what's best\\.\n\n***Option flags***\n*m\\=mute* \\- Mute the audio in the video\n*m\\=audio* \\- Only download the audio\n\n**Example:**\n`https://www.youtube.com/watch?v=dQw4w9WgXcQ m\\=audio`";

pub const SUPPORTED: &str = "Here is a list of supported services:\n\n\\- Bilibili\n\\- Bluesky\n\\- Dailymotion\n\\- Instagram\n\\- Facebook\n\\- Loom\n\\- Ok\\.ru\n\\- Pinterest\n\\- Reddit\n\\- Rutube\n\\- Snapchat\n\\- Soundcloud\n\\- Streamable\n\\- Tiktok\n\\- Tumblr\n\\- Twitch clips\n\\- Twitter/x\n\\- Vimeo\n\\- Vine\n\\- vk videos & clips\n\\- Youtube\n\nNote: You can't download videos from Soundcloud and you can't download audio only from Facebook, loom, ok\\.ru, and vk\\.";

pub const CREDITS: &str = "***Developed by @finnleyfox***\n\nCobalt Fox is powered by Cobalt\\. Cobalt is a free and open source project that allows you to download videos from various platforms\\. You can find the source code on [GitHub](https://github\\.com/imputnet/cobalt)\\.";

pub const INVALID_LINK: &str = "Please provide a valid link";
pub const RESOLVING: &str = "🔍 Resolving the URL...";
pub const EMPTY_FETCH: &str = "❌ Cobalt was able to resolve the URL, but the response from the server was empty. I'm sorry.";
pub const PROCESSING_ERROR: &str = "❌ There was an error while processing the video. Please try again later.";
pub const DOWNLOADING: &str = "🔽 Download in progress...";
pub const SENDING: &str = "✅ Download complete! Sending...";
pub const TELEGRAM_TOO_LARGE: &str = "❌ The file exceeds 50mb and is too large to send due to Telegrams API restrictions. I'm sorry.";
pub const LINK_ERROR: &str = "❌ There was an error while processing the link. Please try again later.";
pub const PICKER_CAPTION: &str = "✅ Resolve complete! Please select the medium you want to download.";
pub const PICKER_UNSUPPORTED: &str = "❌ I was able to resolve the URL, but there are multiple choices. This isn't supported yet. Please try again later.";
pub const PICKER_FAILED: &str = "❌ I was able to resolve the URL, but couldn't build a preview of the choices. Please try again later.";
pub const PICKER_EXPIRED: &str = "This selection has expired";
pub const PICKER_INVALID: &str = "Unknown choice";
pub const ANALYZING: &str = "🔍 Analysis...";
pub const ANIMATED_STICKER: &str = "❌ Animated stickers are not supported.";
pub const STICKER_ERROR: &str = "❌ There was an error while processing the sticker. Please try again later.";

pub fn rejected(code: &str) -> String {
    format!("❌ Cobalt couldn't resolve the URL. Please make sure that the URL is supported.\n\nError Code: {code:?}")
}

pub fn too_large_link(url: &str, limit_mb: u64) -> [String; 2] {
    [
        format!("⚠ The file exceeds {limit_mb}mb and cannot be downloaded. A link will be provided instead. Please note that the link will expire within a few minutes."),
        format!("✅ Resolve complete! Here is the download link: {url}"),
    ]
}

pub fn uploading(host: &str, limit_mb: u64) -> String {
    format!("⚠ The file is larger than {limit_mb}mb and is being uploaded to {host}...")
}

pub fn uploaded(link: &str, expires_at: &str) -> String {
    format!("✅ Download complete! Here is the download link: {link}.\nPlease note that the link will expire within {expires_at}.")
}
