// src/services/notification.rs
//
// Aviso ao auditor designado. Melhor esforço: cada canal devolve
// `ChannelResult` e nenhuma falha é propagada como erro.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Serialize;

use crate::models::{audit::{ChannelResult, NotificationReport}, client::Client};

/// Um auditor do roster configurado.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditorContact {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// Lê `AUDITOR_ROSTER` no formato `Nome|telefone|email;Nome2|telefone|email`.
/// Entradas sem nome são ignoradas; telefone e e-mail são opcionais.
pub fn parse_roster(raw: &str) -> Vec<AuditorContact> {
    raw.split(';')
        .filter_map(|entry| {
            let mut parts = entry.split('|').map(str::trim);
            let name = parts.next().filter(|n| !n.is_empty())?;
            let non_empty = |s: Option<&str>| s.filter(|v| !v.is_empty()).map(str::to_string);
            Some(AuditorContact {
                name: name.to_string(),
                phone: non_empty(parts.next()),
                email: non_empty(parts.next()),
            })
        })
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct AuditorRoster {
    contacts: Vec<AuditorContact>,
}

impl AuditorRoster {
    pub fn new(contacts: Vec<AuditorContact>) -> Self {
        Self { contacts }
    }

    pub fn from_config(raw: &str) -> Self {
        Self::new(parse_roster(raw))
    }

    /// Busca por nome, sem diferenciar maiúsculas.
    pub fn find(&self, name: &str) -> Option<&AuditorContact> {
        let wanted = name.trim();
        self.contacts.iter().find(|c| c.name.eq_ignore_ascii_case(wanted))
    }

    pub fn names(&self) -> Vec<&str> {
        self.contacts.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Mensagem já montada para um auditor.
#[derive(Debug, Clone)]
pub struct AssignmentNotice {
    pub auditor: AuditorContact,
    pub subject: String,
    pub body: String,
}

impl AssignmentNotice {
    pub fn for_client(auditor: AuditorContact, client: &Client) -> Self {
        let subject = format!("Nova auditoria: {}", client.name);
        let body = format!(
            "Olá {}, o cliente \"{}\" (status {}) foi atribuído a você para auditoria. \
             DPP: {} / Pago: {}.",
            auditor.name,
            client.name,
            client.status.as_str(),
            client.dpp,
            client.dp_paid
        );
        Self { auditor, subject, body }
    }
}

#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn name(&self) -> &'static str;
    async fn send(&self, notice: &AssignmentNotice) -> ChannelResult;
}

// =============================================================================
//  WHATSAPP (gateway HTTP)
// =============================================================================

#[derive(Serialize)]
struct WhatsAppMessage<'a> {
    target: &'a str,
    message: &'a str,
}

#[derive(Clone)]
pub struct WhatsAppGateway {
    http: HttpClient,
    url: Option<String>,
    token: Option<String>,
}

impl WhatsAppGateway {
    pub fn new(http: HttpClient, url: Option<String>, token: Option<String>) -> Self {
        Self { http, url, token }
    }
}

#[async_trait]
impl NotificationChannel for WhatsAppGateway {
    fn name(&self) -> &'static str {
        "whatsapp"
    }

    async fn send(&self, notice: &AssignmentNotice) -> ChannelResult {
        let Some(url) = self.url.as_deref() else {
            return ChannelResult::failed("WhatsApp não configurado");
        };
        let Some(phone) = notice.auditor.phone.as_deref() else {
            return ChannelResult::failed("Auditor sem telefone cadastrado");
        };

        let mut request = self.http.post(url).json(&WhatsAppMessage {
            target: phone,
            message: &notice.body,
        });
        if let Some(token) = self.token.as_deref() {
            request = request.bearer_auth(token);
        }
        deliver(request).await
    }
}

// =============================================================================
//  E-MAIL (relay HTTP)
// =============================================================================

#[derive(Serialize)]
struct EmailMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

#[derive(Clone)]
pub struct EmailGateway {
    http: HttpClient,
    url: Option<String>,
    token: Option<String>,
    from: String,
}

impl EmailGateway {
    pub fn new(http: HttpClient, url: Option<String>, token: Option<String>, from: String) -> Self {
        Self { http, url, token, from }
    }
}

#[async_trait]
impl NotificationChannel for EmailGateway {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn send(&self, notice: &AssignmentNotice) -> ChannelResult {
        let Some(url) = self.url.as_deref() else {
            return ChannelResult::failed("E-mail não configurado");
        };
        let Some(to) = notice.auditor.email.as_deref() else {
            return ChannelResult::failed("Auditor sem e-mail cadastrado");
        };

        let mut request = self.http.post(url).json(&EmailMessage {
            from: &self.from,
            to,
            subject: &notice.subject,
            text: &notice.body,
        });
        if let Some(token) = self.token.as_deref() {
            request = request.bearer_auth(token);
        }
        deliver(request).await
    }
}

async fn deliver(request: reqwest::RequestBuilder) -> ChannelResult {
    match request.send().await {
        Ok(response) if response.status().is_success() => ChannelResult::sent(),
        Ok(response) => ChannelResult::failed(format!("Gateway respondeu {}", response.status())),
        Err(e) => ChannelResult::failed(format!("Falha de rede: {}", e)),
    }
}

// =============================================================================
//  NOTIFIER: os dois canais em paralelo, com prazo único
// =============================================================================

#[derive(Clone)]
pub struct Notifier {
    whatsapp: Arc<dyn NotificationChannel>,
    email: Arc<dyn NotificationChannel>,
    timeout: Duration,
}

impl Notifier {
    pub fn new(
        whatsapp: Arc<dyn NotificationChannel>,
        email: Arc<dyn NotificationChannel>,
        timeout: Duration,
    ) -> Self {
        Self { whatsapp, email, timeout }
    }

    pub async fn notify(&self, notice: &AssignmentNotice) -> NotificationReport {
        let (whatsapp, email) = tokio::join!(
            self.send_bounded(self.whatsapp.as_ref(), notice),
            self.send_bounded(self.email.as_ref(), notice),
        );
        NotificationReport { whatsapp, email }
    }

    async fn send_bounded(
        &self,
        channel: &dyn NotificationChannel,
        notice: &AssignmentNotice,
    ) -> ChannelResult {
        let result = match tokio::time::timeout(self.timeout, channel.send(notice)).await {
            Ok(result) => result,
            Err(_) => ChannelResult::failed(format!(
                "Tempo esgotado após {}ms",
                self.timeout.as_millis()
            )),
        };
        if let Some(reason) = &result.reason {
            tracing::warn!(
                "📵 Notificação via {} para {} falhou: {}",
                channel.name(),
                notice.auditor.name,
                reason
            );
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedChannel(ChannelResult);

    #[async_trait]
    impl NotificationChannel for FixedChannel {
        fn name(&self) -> &'static str {
            "fixed"
        }
        async fn send(&self, _notice: &AssignmentNotice) -> ChannelResult {
            self.0.clone()
        }
    }

    struct SlowChannel;

    #[async_trait]
    impl NotificationChannel for SlowChannel {
        fn name(&self) -> &'static str {
            "slow"
        }
        async fn send(&self, _notice: &AssignmentNotice) -> ChannelResult {
            tokio::time::sleep(Duration::from_secs(30)).await;
            ChannelResult::sent()
        }
    }

    fn notice() -> AssignmentNotice {
        AssignmentNotice {
            auditor: AuditorContact {
                name: "Budi".into(),
                phone: Some("62811".into()),
                email: None,
            },
            subject: "s".into(),
            body: "b".into(),
        }
    }

    #[test]
    fn roster_parses_optional_fields_and_skips_blank_names() {
        let roster = parse_roster("Budi|62811|budi@audit.id; Sari||sari@audit.id ;|123|x; Tono");
        assert_eq!(roster.len(), 3);
        assert_eq!(roster[0].phone.as_deref(), Some("62811"));
        assert_eq!(roster[1].phone, None);
        assert_eq!(roster[1].email.as_deref(), Some("sari@audit.id"));
        assert_eq!(roster[2].name, "Tono");
        assert_eq!(roster[2].email, None);
    }

    #[test]
    fn roster_lookup_ignores_case() {
        let roster = AuditorRoster::from_config("Budi|1|b@x.id");
        assert!(roster.find(" budi ").is_some());
        assert!(roster.find("Andi").is_none());
    }

    #[tokio::test]
    async fn one_failed_channel_does_not_affect_the_other() {
        let notifier = Notifier::new(
            Arc::new(FixedChannel(ChannelResult::sent())),
            Arc::new(FixedChannel(ChannelResult::failed("smtp down"))),
            Duration::from_secs(1),
        );
        let report = notifier.notify(&notice()).await;
        assert!(report.whatsapp.sent);
        assert!(!report.email.sent);
        assert_eq!(report.email.reason.as_deref(), Some("smtp down"));
    }

    #[tokio::test]
    async fn slow_channel_is_cut_by_the_timeout() {
        let notifier = Notifier::new(
            Arc::new(SlowChannel),
            Arc::new(FixedChannel(ChannelResult::sent())),
            Duration::from_millis(50),
        );
        let report = notifier.notify(&notice()).await;
        assert!(!report.whatsapp.sent);
        assert!(report.whatsapp.reason.unwrap().contains("Tempo esgotado"));
        assert!(report.email.sent);
    }

    #[tokio::test]
    async fn unconfigured_gateways_report_reason() {
        let http = HttpClient::new();
        let wa = WhatsAppGateway::new(http.clone(), None, None);
        let mail = EmailGateway::new(http, None, None, "noreply@x.id".into());
        let result = wa.send(&notice()).await;
        assert!(!result.sent);
        let result = mail.send(&notice()).await;
        assert_eq!(result.reason.as_deref(), Some("E-mail não configurado"));
    }
}
