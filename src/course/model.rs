use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::documents::common::{duration_hours, parse_time};

/// Delivery mode of a course.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum TipoCorso {
    #[serde(rename = "FAD")]
    Fad,
    #[serde(rename = "presenza")]
    Presenza,
    #[serde(rename = "misto")]
    Misto,
    #[default]
    #[serde(rename = "")]
    NonSpecificato,
}

impl TipoCorso {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fad => "FAD",
            Self::Presenza => "presenza",
            Self::Misto => "misto",
            Self::NonSpecificato => "",
        }
    }
}

/// Course identity and scheduling summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct Corso {
    pub id: String,
    pub titolo: String,
    pub tipo: TipoCorso,
    pub data_inizio: String,
    pub data_fine: String,
    pub ore_totali: String,
    pub ore_rendicontabili: String,
    /// Capacity as entered, `"N/M"`.
    pub capienza: String,
    pub capienza_numero: u32,
    pub capienza_totale: u32,
    pub stato: String,
    pub anno: String,
    pub offerta_codice: String,
    pub offerta_nome: String,
}

/// One teaching interval.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct Sessione {
    /// 1-based position within the owning collection.
    pub numero: u32,
    /// `DD/MM/YYYY`
    pub data_completa: String,
    pub giorno: String,
    pub mese: String,
    pub mese_numero: String,
    pub anno: String,
    pub giorno_settimana: String,
    pub ora_inizio: String,
    pub ora_fine: String,
    pub sede: String,
    pub tipo_sede: String,
    pub is_fad: bool,
    pub argomento: Option<String>,
    pub durata: Option<String>,
}

impl Sessione {
    /// Worked hours, lunch break excluded.
    ///
    /// Start/end times are authoritative; the stored `durata` is only used
    /// when the times are missing or unparseable.
    pub fn durata_ore(&self) -> u32 {
        if parse_time(&self.ora_inizio).is_some() && parse_time(&self.ora_fine).is_some() {
            return duration_hours(&self.ora_inizio, &self.ora_fine);
        }
        self.durata
            .as_deref()
            .and_then(|d| d.trim().replace(',', ".").parse::<f64>().ok())
            .map(|h| h.max(0.0).round() as u32)
            .unwrap_or(0)
    }
}

/// A course module with its own schedule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct Modulo {
    pub id: String,
    /// Authoritative identifier of the module.
    pub id_sezione: String,
    pub titolo: String,
    pub argomenti: Vec<String>,
    pub data_inizio: String,
    pub data_fine: String,
    pub ore_totali: String,
    pub ore_rendicontabili: String,
    pub tipo_sede: String,
    pub sessioni: Vec<Sessione>,
    pub sessioni_presenza: Vec<Sessione>,
}

impl Modulo {
    /// Section id when present, otherwise the plain id.
    pub fn identifier(&self) -> &str {
        if self.id_sezione.trim().is_empty() {
            self.id.trim()
        } else {
            self.id_sezione.trim()
        }
    }

    pub fn sessioni_fad(&self) -> impl Iterator<Item = &Sessione> {
        self.sessioni.iter().filter(|s| s.is_fad)
    }
}

/// Training venue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct Sede {
    pub tipo: String,
    pub nome: String,
    pub indirizzo: String,
    pub citta: String,
    pub provincia: String,
    pub cap: String,
}

/// Accredited address of the training body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct SedeAccreditata {
    pub nome: String,
    pub via: String,
    pub numero_civico: String,
    pub comune: String,
    pub cap: String,
    pub provincia: String,
}

impl SedeAccreditata {
    /// Street, number, postcode, town and province on one line.
    pub fn indirizzo_completo(&self) -> String {
        let street = [self.via.trim(), self.numero_civico.trim()]
            .into_iter()
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        let mut town = [self.cap.trim(), self.comune.trim()]
            .into_iter()
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if !self.provincia.trim().is_empty() {
            town = format!("{} ({})", town, self.provincia.trim()).trim().to_string();
        }
        [street, town]
            .into_iter()
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Training body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct Ente {
    pub id: String,
    pub nome: String,
    pub indirizzo: String,
    pub accreditato: SedeAccreditata,
}

/// A named role holder (trainer, tutor, director, supervisor...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct Persona {
    pub nome: String,
    pub cognome: String,
    pub nome_completo: String,
    pub codice_fiscale: String,
    pub email: String,
    pub telefono: String,
    pub qualifica: String,
}

impl Persona {
    /// `nome_completo` when filled in, otherwise `nome cognome`.
    pub fn display_name(&self) -> String {
        if !self.nome_completo.trim().is_empty() {
            return self.nome_completo.trim().to_string();
        }
        join_name(&self.nome, &self.cognome)
    }

    /// First and last name, splitting `nome_completo` on its first space
    /// when the separate fields are empty.
    pub fn name_parts(&self) -> (String, String) {
        if !self.nome.trim().is_empty() || !self.cognome.trim().is_empty() {
            return (self.nome.trim().to_string(), self.cognome.trim().to_string());
        }
        match self.nome_completo.trim().split_once(char::is_whitespace) {
            Some((first, last)) => (first.to_string(), last.trim().to_string()),
            None => (self.nome_completo.trim().to_string(), String::new()),
        }
    }
}

/// A course participant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct Partecipante {
    pub id: String,
    pub nome: String,
    pub cognome: String,
    pub codice_fiscale: String,
    pub email: Option<String>,
    pub telefono: Option<String>,
    /// GOL/PNRR beneficiary.
    pub benefits: bool,
}

impl Partecipante {
    pub fn nome_completo(&self) -> String {
        join_name(&self.nome, &self.cognome)
    }
}

/// Distance-learning settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct FadSettings {
    pub piattaforma: String,
    pub modalita_gestione: String,
    pub modalita_valutazione: String,
    pub obiettivi_didattici: String,
    pub id_riunione: String,
    pub passcode: String,
    pub link: String,
    /// Embed the trainer's signature image into FAD documents.
    pub include_firma: bool,
}

/// Root aggregate describing one course.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct CourseData {
    pub corso: Corso,
    pub moduli: Vec<Modulo>,
    pub sede: Sede,
    pub ente: Ente,
    pub trainer: Persona,
    pub tutor: Persona,
    pub direttore: Persona,
    pub supervisore: Persona,
    pub responsabile_certificazione: Persona,
    pub partecipanti: Vec<Partecipante>,
    pub fad_settings: FadSettings,
}

impl CourseData {
    /// Course start date, falling back to the first module's start.
    pub fn data_inizio(&self) -> &str {
        if !self.corso.data_inizio.trim().is_empty() {
            return self.corso.data_inizio.trim();
        }
        self.moduli
            .iter()
            .map(|m| m.data_inizio.trim())
            .find(|d| !d.is_empty())
            .unwrap_or("")
    }

    /// Course end date, falling back to the last module's end.
    pub fn data_fine(&self) -> &str {
        if !self.corso.data_fine.trim().is_empty() {
            return self.corso.data_fine.trim();
        }
        self.moduli
            .iter()
            .rev()
            .map(|m| m.data_fine.trim())
            .find(|d| !d.is_empty())
            .unwrap_or("")
    }

    pub fn modulo(&self, index: usize) -> Option<&Modulo> {
        self.moduli.get(index)
    }

    pub fn is_multi_module(&self) -> bool {
        self.moduli.len() > 1
    }

    pub fn beneficiari(&self) -> impl Iterator<Item = &Partecipante> {
        self.partecipanti.iter().filter(|p| p.benefits)
    }

    pub fn has_beneficiari(&self) -> bool {
        self.partecipanti.iter().any(|p| p.benefits)
    }

    /// Every session of every module, in module order.
    pub fn all_sessions(&self) -> impl Iterator<Item = &Sessione> {
        self.moduli.iter().flat_map(|m| m.sessioni.iter())
    }

    /// A copy restricted to one module, with the course dates and hours
    /// replaced by the module's own values where those are filled in.
    pub fn scoped_to_module(&self, index: usize) -> Option<CourseData> {
        let modulo = self.moduli.get(index)?.clone();
        let mut scoped = self.clone();
        let override_if_set = |target: &mut String, value: &str| {
            if !value.trim().is_empty() {
                *target = value.trim().to_string();
            }
        };
        override_if_set(&mut scoped.corso.data_inizio, &modulo.data_inizio);
        override_if_set(&mut scoped.corso.data_fine, &modulo.data_fine);
        override_if_set(&mut scoped.corso.ore_totali, &modulo.ore_totali);
        override_if_set(&mut scoped.corso.ore_rendicontabili, &modulo.ore_rendicontabili);
        scoped.moduli = vec![modulo];
        Some(scoped)
    }
}

pub(crate) fn join_name(first: &str, last: &str) -> String {
    [first.trim(), last.trim()]
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
