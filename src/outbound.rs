use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::InputFile;

use crate::db::models::Session;
use crate::i18n;

/// A message reduced to its richest content kind, ready to re-send by file id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundPayload {
    Text(String),
    Photo { file_id: String, caption: Option<String> },
    Document { file_id: String, caption: Option<String> },
    Video { file_id: String, caption: Option<String> },
    Audio { file_id: String, caption: Option<String> },
    Voice { file_id: String, caption: Option<String> },
    Sticker { file_id: String },
    /// Anything else gets a generic notice instead of the original content.
    Unsupported,
}

/// Classifies an inbound message by content kind. Inbound messages carry
/// exactly one kind, so the order below is just a checklist.
pub fn classify(msg: &Message) -> OutboundPayload {
    let caption = msg.caption().map(|c| c.to_string());

    if let Some(text) = msg.text() {
        return OutboundPayload::Text(text.to_string());
    }
    if let Some(photos) = msg.photo() {
        // Telegram sends several sizes; the last one is the largest.
        if let Some(photo) = photos.last() {
            return OutboundPayload::Photo {
                file_id: photo.file.id.clone(),
                caption,
            };
        }
    }
    if let Some(doc) = msg.document() {
        return OutboundPayload::Document {
            file_id: doc.file.id.clone(),
            caption,
        };
    }
    if let Some(video) = msg.video() {
        return OutboundPayload::Video {
            file_id: video.file.id.clone(),
            caption,
        };
    }
    if let Some(audio) = msg.audio() {
        return OutboundPayload::Audio {
            file_id: audio.file.id.clone(),
            caption,
        };
    }
    if let Some(voice) = msg.voice() {
        return OutboundPayload::Voice {
            file_id: voice.file.id.clone(),
            caption,
        };
    }
    if let Some(sticker) = msg.sticker() {
        return OutboundPayload::Sticker {
            file_id: sticker.file.id.clone(),
        };
    }

    OutboundPayload::Unsupported
}

/// Delivery seam so fan-out can run against a mock in tests.
#[async_trait]
pub trait Outbound: Send + Sync {
    async fn deliver(&self, recipient: &Session, payload: &OutboundPayload) -> anyhow::Result<()>;
}

/// Real delivery through a tenant's (or the maker's) bot handle.
pub struct TelegramOutbound {
    bot: Bot,
}

impl TelegramOutbound {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Outbound for TelegramOutbound {
    async fn deliver(&self, recipient: &Session, payload: &OutboundPayload) -> anyhow::Result<()> {
        let chat = ChatId(recipient.user_id.parse::<i64>()?);

        match payload {
            OutboundPayload::Text(text) => {
                self.bot.send_message(chat, text).await?;
            }
            OutboundPayload::Photo { file_id, caption } => {
                let req = self.bot.send_photo(chat, InputFile::file_id(file_id.clone()));
                match caption {
                    Some(c) => req.caption(c.clone()).await?,
                    None => req.await?,
                };
            }
            OutboundPayload::Document { file_id, caption } => {
                let req = self.bot.send_document(chat, InputFile::file_id(file_id.clone()));
                match caption {
                    Some(c) => req.caption(c.clone()).await?,
                    None => req.await?,
                };
            }
            OutboundPayload::Video { file_id, caption } => {
                let req = self.bot.send_video(chat, InputFile::file_id(file_id.clone()));
                match caption {
                    Some(c) => req.caption(c.clone()).await?,
                    None => req.await?,
                };
            }
            OutboundPayload::Audio { file_id, caption } => {
                let req = self.bot.send_audio(chat, InputFile::file_id(file_id.clone()));
                match caption {
                    Some(c) => req.caption(c.clone()).await?,
                    None => req.await?,
                };
            }
            OutboundPayload::Voice { file_id, caption } => {
                let req = self.bot.send_voice(chat, InputFile::file_id(file_id.clone()));
                match caption {
                    Some(c) => req.caption(c.clone()).await?,
                    None => req.await?,
                };
            }
            OutboundPayload::Sticker { file_id } => {
                self.bot
                    .send_sticker(chat, InputFile::file_id(file_id.clone()))
                    .await?;
            }
            OutboundPayload::Unsupported => {
                let lang = i18n::resolve_lang(recipient.language.as_deref(), None);
                self.bot
                    .send_message(chat, i18n::t(&lang, "broadcast-fallback"))
                    .await?;
            }
        }

        Ok(())
    }
}
