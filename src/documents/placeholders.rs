//! The placeholder map consumed by the template renderer.
//!
//! The map is a closed schema: scalar keys, typed repeating sections and
//! the optional per-document scopes (one session, one participant) are all
//! fields of [`PlaceholderMap`]. Serializing it yields the exact tag names
//! templates use, and [`PlaceholderMap::is_known_tag`] lets uploads be
//! checked against that same schema.
//!
//! `STUDENTI` and `PARTECIPANTI` carry the same participants with two
//! different field casings. Both are kept because existing templates are
//! authored against either one.

use std::collections::{BTreeMap, BTreeSet};

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use super::common::{calendar_days, schedule_range, today_italian};
use crate::course::{CourseData, Modulo, Partecipante, Persona, Sessione};

lazy_static! {
    static ref NUMBERED_PARTICIPANT: Regex = Regex::new(
        r"^PARTECIPANTE_\d+(_NOME|_COGNOME|_COMPLETO|_CF|_CODICE_FISCALE|_EMAIL|_TELEFONO)?$"
    )
    .expect("valid numbered participant regex");
    static ref KNOWN_TAGS: BTreeSet<String> = collect_known_tags();
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Scalars {
    pub corso_id: String,
    pub corso_titolo: String,
    pub corso_tipo: String,
    pub data_inizio: String,
    pub data_fine: String,
    pub ore_totali: String,
    pub ore_rendicontabili: String,
    pub capienza: String,
    pub capienza_numero: String,
    pub capienza_totale: String,
    pub stato: String,
    pub anno: String,
    pub offerta_codice: String,
    pub offerta_nome: String,

    pub modulo_id: String,
    pub id_sezione: String,
    pub modulo_titolo: String,
    pub modulo_data_inizio: String,
    pub modulo_data_fine: String,
    pub modulo_ore: String,
    pub modulo_argomenti: String,

    pub ente_id: String,
    pub ente_nome: String,
    pub ente_indirizzo: String,
    pub ente_accreditato_nome: String,
    pub ente_accreditato_via: String,
    pub ente_accreditato_numero_civico: String,
    pub ente_accreditato_comune: String,
    pub ente_accreditato_cap: String,
    pub ente_accreditato_provincia: String,
    pub ente_accreditato_indirizzo: String,

    pub sede_tipo: String,
    pub sede_nome: String,
    pub sede_indirizzo: String,
    pub sede_citta: String,
    pub sede_provincia: String,
    pub sede_cap: String,

    pub trainer_nome: String,
    pub trainer_cognome: String,
    pub trainer_nome_completo: String,
    pub trainer_codice_fiscale: String,
    pub trainer_email: String,
    pub trainer_telefono: String,
    pub tutor_nome: String,
    pub tutor_cognome: String,
    pub tutor_nome_completo: String,
    pub direttore_nome: String,
    pub direttore_cognome: String,
    pub direttore_nome_completo: String,
    pub supervisore_nome: String,
    pub supervisore_cognome: String,
    pub supervisore_nome_completo: String,
    pub supervisore_email: String,
    pub responsabile_cert_nome: String,
    pub responsabile_cert_cognome: String,
    pub responsabile_cert_nome_completo: String,

    pub piattaforma: String,
    pub modalita_gestione: String,
    pub modalita_valutazione: String,
    pub obiettivi_didattici: String,
    pub id_riunione: String,
    pub passcode: String,
    pub link_riunione: String,

    pub ore_fad: String,
    pub ore_presenza: String,
    pub numero_partecipanti: String,
    pub numero_beneficiari: String,
    pub numero_sessioni: String,
    /// Numbering of the last in-person session: one register page per day.
    pub numero_pagine: String,
    /// Date of the last in-person session.
    pub data_vidimazione: String,
    pub data_odierna: String,
}

/// `STUDENTI` row: upper-case field names.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct StudenteRow {
    pub numero: String,
    pub nome: String,
    pub cognome: String,
    pub nome_completo: String,
    pub codice_fiscale: String,
    pub email: String,
    pub telefono: String,
    pub beneficiario: String,
}

/// `PARTECIPANTI` row: lower-case field names.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PartecipanteRow {
    pub numero: String,
    pub nome: String,
    pub cognome: String,
    pub nome_completo: String,
    pub codice_fiscale: String,
    pub email: String,
    pub telefono: String,
    pub benefits: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct SessioneRow {
    pub numero: String,
    pub data: String,
    pub giorno: String,
    pub mese: String,
    pub mese_numero: String,
    pub anno: String,
    pub giorno_settimana: String,
    pub ora_inizio: String,
    pub ora_fine: String,
    pub orario: String,
    pub durata: String,
    pub sede: String,
    pub tipo_sede: String,
    pub argomento: String,
    pub modalita: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct PartecipanteSessioneRow {
    pub numero: String,
    pub nome: String,
    pub cognome: String,
    pub nome_completo: String,
    pub codice_fiscale: String,
    pub ora_connessione: String,
    pub ora_disconnessione: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct SessioneFadRow {
    #[serde(flatten)]
    pub sessione: SessioneRow,
    pub partecipanti_sessione: Vec<PartecipanteSessioneRow>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ModuloRow {
    pub numero: String,
    pub id: String,
    pub id_sezione: String,
    pub titolo: String,
    pub data_inizio: String,
    pub data_fine: String,
    pub ore_totali: String,
    pub numero_sessioni: String,
    pub argomenti: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ArgomentoRow {
    pub numero: String,
    pub argomento: String,
    pub modulo_titolo: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct CalendarioRow {
    pub data: String,
    pub giorno_settimana: String,
    pub mattina: String,
    pub pomeriggio: String,
    pub ore: String,
}

/// Keys for documents generated once per session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct SessionScope {
    pub sessione_numero: String,
    pub sessione_data: String,
    pub sessione_giorno: String,
    pub sessione_mese: String,
    pub sessione_anno: String,
    pub sessione_giorno_settimana: String,
    pub sessione_orario: String,
    pub sessione_ora_inizio: String,
    pub sessione_ora_fine: String,
    pub sessione_durata: String,
    pub sessione_sede: String,
    pub sessione_argomento: String,
}

/// Keys for documents generated once per participant.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ParticipantScope {
    pub partecipante_nome: String,
    pub partecipante_cognome: String,
    pub partecipante_nome_completo: String,
    pub partecipante_cf: String,
    pub partecipante_codice_fiscale: String,
    pub partecipante_email: String,
    pub partecipante_telefono: String,
}

/// Every value a template can reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlaceholderMap {
    #[serde(flatten)]
    pub scalars: Scalars,
    #[serde(rename = "STUDENTI")]
    pub studenti: Vec<StudenteRow>,
    #[serde(rename = "PARTECIPANTI")]
    pub partecipanti: Vec<PartecipanteRow>,
    #[serde(rename = "SESSIONI")]
    pub sessioni: Vec<SessioneRow>,
    #[serde(rename = "SESSIONI_FAD")]
    pub sessioni_fad: Vec<SessioneFadRow>,
    #[serde(rename = "SESSIONI_PRESENZA")]
    pub sessioni_presenza: Vec<SessioneRow>,
    #[serde(rename = "MODULI")]
    pub moduli: Vec<ModuloRow>,
    #[serde(rename = "LISTA_ARGOMENTI")]
    pub lista_argomenti: Vec<ArgomentoRow>,
    #[serde(rename = "CALENDARIO")]
    pub calendario: Vec<CalendarioRow>,
    /// `PARTECIPANTE_{n}`, `PARTECIPANTE_{n}_NOME`, ...
    #[serde(flatten)]
    pub numbered: BTreeMap<String, String>,
    #[serde(flatten)]
    pub session: Option<SessionScope>,
    #[serde(flatten)]
    pub participant: Option<ParticipantScope>,
    /// Trainer signature as a `data:image/...;base64,` URL, or empty.
    #[serde(rename = "FIRMA_TRAINER")]
    pub firma_trainer: String,
}

impl PlaceholderMap {
    /// Scope the map to one session.
    pub fn with_session(mut self, session: &Sessione) -> Self {
        self.session = Some(SessionScope {
            sessione_numero: session.numero.to_string(),
            sessione_data: session.data_completa.clone(),
            sessione_giorno: session.giorno.clone(),
            sessione_mese: session.mese.clone(),
            sessione_anno: session.anno.clone(),
            sessione_giorno_settimana: session.giorno_settimana.clone(),
            sessione_orario: schedule_range(session),
            sessione_ora_inizio: session.ora_inizio.clone(),
            sessione_ora_fine: session.ora_fine.clone(),
            sessione_durata: session.durata_ore().to_string(),
            sessione_sede: session.sede.clone(),
            sessione_argomento: session.argomento.clone().unwrap_or_default(),
        });
        self
    }

    /// Scope the map to one participant.
    pub fn with_participant(mut self, partecipante: &Partecipante) -> Self {
        self.participant = Some(ParticipantScope {
            partecipante_nome: partecipante.nome.clone(),
            partecipante_cognome: partecipante.cognome.clone(),
            partecipante_nome_completo: partecipante.nome_completo(),
            partecipante_cf: partecipante.codice_fiscale.clone(),
            partecipante_codice_fiscale: partecipante.codice_fiscale.clone(),
            partecipante_email: partecipante.email.clone().unwrap_or_default(),
            partecipante_telefono: partecipante.telefono.clone().unwrap_or_default(),
        });
        self
    }

    /// Attach the trainer's signature data URL.
    pub fn with_signature(mut self, signature: Option<&str>) -> Self {
        self.firma_trainer = signature.unwrap_or_default().trim().to_string();
        self
    }

    /// JSON view used by the renderer.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Whether a tag name is part of the schema, at any nesting level.
    pub fn is_known_tag(name: &str) -> bool {
        KNOWN_TAGS.contains(name) || NUMBERED_PARTICIPANT.is_match(name)
    }
}

/// Every key reachable from a fully populated sample map.
fn collect_known_tags() -> BTreeSet<String> {
    let sample = PlaceholderMap {
        studenti: vec![StudenteRow::default()],
        partecipanti: vec![PartecipanteRow::default()],
        sessioni: vec![SessioneRow::default()],
        sessioni_fad: vec![SessioneFadRow {
            sessione: SessioneRow::default(),
            partecipanti_sessione: vec![PartecipanteSessioneRow::default()],
        }],
        sessioni_presenza: vec![SessioneRow::default()],
        moduli: vec![ModuloRow::default()],
        lista_argomenti: vec![ArgomentoRow::default()],
        calendario: vec![CalendarioRow::default()],
        session: Some(SessionScope::default()),
        participant: Some(ParticipantScope::default()),
        ..Default::default()
    };

    fn walk(value: &Value, out: &mut BTreeSet<String>) {
        match value {
            Value::Object(map) => {
                for (key, inner) in map {
                    out.insert(key.clone());
                    walk(inner, out);
                }
            }
            Value::Array(items) => items.iter().for_each(|item| walk(item, out)),
            _ => {}
        }
    }

    let mut tags = BTreeSet::new();
    walk(&sample.to_value(), &mut tags);
    tags
}

fn persona_parts(persona: &Persona) -> (String, String, String) {
    let (nome, cognome) = persona.name_parts();
    (nome, cognome, persona.display_name())
}

fn session_row(session: &Sessione) -> SessioneRow {
    SessioneRow {
        numero: session.numero.to_string(),
        data: session.data_completa.clone(),
        giorno: session.giorno.clone(),
        mese: session.mese.clone(),
        mese_numero: session.mese_numero.clone(),
        anno: session.anno.clone(),
        giorno_settimana: session.giorno_settimana.clone(),
        ora_inizio: session.ora_inizio.clone(),
        ora_fine: session.ora_fine.clone(),
        orario: schedule_range(session),
        durata: session.durata_ore().to_string(),
        sede: session.sede.clone(),
        tipo_sede: session.tipo_sede.clone(),
        argomento: session.argomento.clone().unwrap_or_default(),
        modalita: if session.is_fad { "FAD" } else { "Presenza" }.to_string(),
    }
}

fn module_scalars(scalars: &mut Scalars, modulo: &Modulo) {
    scalars.modulo_id = modulo.id.clone();
    scalars.id_sezione = modulo.identifier().to_string();
    scalars.modulo_titolo = modulo.titolo.clone();
    scalars.modulo_data_inizio = modulo.data_inizio.clone();
    scalars.modulo_data_fine = modulo.data_fine.clone();
    scalars.modulo_ore = modulo.ore_totali.clone();
    scalars.modulo_argomenti = modulo.argomenti.join(", ");
}

/// Build the placeholder map for one module of a course.
///
/// Session-based keys come from the selected module (index 0 when out of
/// range); `MODULI` and `LISTA_ARGOMENTI` span the whole course. Numbered
/// participant keys follow array position.
pub fn map_to_placeholders(course: &CourseData, module_index: usize) -> PlaceholderMap {
    let modulo = course
        .modulo(module_index)
        .or_else(|| course.moduli.first())
        .cloned()
        .unwrap_or_default();

    let corso = &course.corso;
    let ente = &course.ente;
    let sede = &course.sede;
    let fad = &course.fad_settings;

    let (trainer_nome, trainer_cognome, trainer_completo) = persona_parts(&course.trainer);
    let (tutor_nome, tutor_cognome, tutor_completo) = persona_parts(&course.tutor);
    let (dir_nome, dir_cognome, dir_completo) = persona_parts(&course.direttore);
    let (sup_nome, sup_cognome, sup_completo) = persona_parts(&course.supervisore);
    let (resp_nome, resp_cognome, resp_completo) =
        persona_parts(&course.responsabile_certificazione);

    let ore_fad: u32 = modulo.sessioni_fad().map(Sessione::durata_ore).sum();
    let ore_presenza: u32 = modulo
        .sessioni
        .iter()
        .filter(|s| !s.is_fad)
        .map(Sessione::durata_ore)
        .sum();
    let last_presenza = modulo.sessioni_presenza.last();

    let mut scalars = Scalars {
        corso_id: corso.id.clone(),
        corso_titolo: corso.titolo.clone(),
        corso_tipo: corso.tipo.as_str().to_string(),
        data_inizio: course.data_inizio().to_string(),
        data_fine: course.data_fine().to_string(),
        ore_totali: corso.ore_totali.clone(),
        ore_rendicontabili: corso.ore_rendicontabili.clone(),
        capienza: corso.capienza.clone(),
        capienza_numero: corso.capienza_numero.to_string(),
        capienza_totale: corso.capienza_totale.to_string(),
        stato: corso.stato.clone(),
        anno: corso.anno.clone(),
        offerta_codice: corso.offerta_codice.clone(),
        offerta_nome: corso.offerta_nome.clone(),

        ente_id: ente.id.clone(),
        ente_nome: ente.nome.clone(),
        ente_indirizzo: ente.indirizzo.clone(),
        ente_accreditato_nome: ente.accreditato.nome.clone(),
        ente_accreditato_via: ente.accreditato.via.clone(),
        ente_accreditato_numero_civico: ente.accreditato.numero_civico.clone(),
        ente_accreditato_comune: ente.accreditato.comune.clone(),
        ente_accreditato_cap: ente.accreditato.cap.clone(),
        ente_accreditato_provincia: ente.accreditato.provincia.clone(),
        ente_accreditato_indirizzo: ente.accreditato.indirizzo_completo(),

        sede_tipo: sede.tipo.clone(),
        sede_nome: sede.nome.clone(),
        sede_indirizzo: sede.indirizzo.clone(),
        sede_citta: sede.citta.clone(),
        sede_provincia: sede.provincia.clone(),
        sede_cap: sede.cap.clone(),

        trainer_nome,
        trainer_cognome,
        trainer_nome_completo: trainer_completo,
        trainer_codice_fiscale: course.trainer.codice_fiscale.clone(),
        trainer_email: course.trainer.email.clone(),
        trainer_telefono: course.trainer.telefono.clone(),
        tutor_nome,
        tutor_cognome,
        tutor_nome_completo: tutor_completo,
        direttore_nome: dir_nome,
        direttore_cognome: dir_cognome,
        direttore_nome_completo: dir_completo,
        supervisore_nome: sup_nome,
        supervisore_cognome: sup_cognome,
        supervisore_nome_completo: sup_completo,
        supervisore_email: course.supervisore.email.clone(),
        responsabile_cert_nome: resp_nome,
        responsabile_cert_cognome: resp_cognome,
        responsabile_cert_nome_completo: resp_completo,

        piattaforma: fad.piattaforma.clone(),
        modalita_gestione: fad.modalita_gestione.clone(),
        modalita_valutazione: fad.modalita_valutazione.clone(),
        obiettivi_didattici: fad.obiettivi_didattici.clone(),
        id_riunione: fad.id_riunione.clone(),
        passcode: fad.passcode.clone(),
        link_riunione: fad.link.clone(),

        ore_fad: ore_fad.to_string(),
        ore_presenza: ore_presenza.to_string(),
        numero_partecipanti: course.partecipanti.len().to_string(),
        numero_beneficiari: course.beneficiari().count().to_string(),
        numero_sessioni: modulo.sessioni.len().to_string(),
        numero_pagine: last_presenza.map(|s| s.numero.to_string()).unwrap_or_else(|| "0".to_string()),
        data_vidimazione: last_presenza.map(|s| s.data_completa.clone()).unwrap_or_default(),
        data_odierna: today_italian(),
        ..Default::default()
    };
    module_scalars(&mut scalars, &modulo);

    let studenti = course
        .partecipanti
        .iter()
        .enumerate()
        .map(|(i, p)| StudenteRow {
            numero: (i + 1).to_string(),
            nome: p.nome.clone(),
            cognome: p.cognome.clone(),
            nome_completo: p.nome_completo(),
            codice_fiscale: p.codice_fiscale.clone(),
            email: p.email.clone().unwrap_or_default(),
            telefono: p.telefono.clone().unwrap_or_default(),
            beneficiario: if p.benefits { "Sì" } else { "No" }.to_string(),
        })
        .collect();

    let partecipanti = course
        .partecipanti
        .iter()
        .enumerate()
        .map(|(i, p)| PartecipanteRow {
            numero: (i + 1).to_string(),
            nome: p.nome.clone(),
            cognome: p.cognome.clone(),
            nome_completo: p.nome_completo(),
            codice_fiscale: p.codice_fiscale.clone(),
            email: p.email.clone().unwrap_or_default(),
            telefono: p.telefono.clone().unwrap_or_default(),
            benefits: p.benefits,
        })
        .collect();

    let sessioni_fad = modulo
        .sessioni_fad()
        .map(|s| SessioneFadRow {
            sessione: session_row(s),
            partecipanti_sessione: course
                .partecipanti
                .iter()
                .enumerate()
                .map(|(i, p)| PartecipanteSessioneRow {
                    numero: (i + 1).to_string(),
                    nome: p.nome.clone(),
                    cognome: p.cognome.clone(),
                    nome_completo: p.nome_completo(),
                    codice_fiscale: p.codice_fiscale.clone(),
                    ora_connessione: s.ora_inizio.clone(),
                    ora_disconnessione: s.ora_fine.clone(),
                })
                .collect(),
        })
        .collect();

    let moduli = course
        .moduli
        .iter()
        .enumerate()
        .map(|(i, m)| ModuloRow {
            numero: (i + 1).to_string(),
            id: m.id.clone(),
            id_sezione: m.identifier().to_string(),
            titolo: m.titolo.clone(),
            data_inizio: m.data_inizio.clone(),
            data_fine: m.data_fine.clone(),
            ore_totali: m.ore_totali.clone(),
            numero_sessioni: m.sessioni.len().to_string(),
            argomenti: m.argomenti.join(", "),
        })
        .collect();

    let lista_argomenti = course
        .moduli
        .iter()
        .flat_map(|m| m.argomenti.iter().map(move |a| (a, m.titolo.clone())))
        .enumerate()
        .map(|(i, (argomento, modulo_titolo))| ArgomentoRow {
            numero: (i + 1).to_string(),
            argomento: argomento.clone(),
            modulo_titolo,
        })
        .collect();

    let calendario = calendar_days(&modulo.sessioni)
        .into_iter()
        .map(|day| CalendarioRow {
            mattina: day.mattina_label(),
            pomeriggio: day.pomeriggio_label(),
            ore: day.ore.to_string(),
            data: day.data,
            giorno_settimana: day.giorno_settimana,
        })
        .collect();

    PlaceholderMap {
        scalars,
        studenti,
        partecipanti,
        sessioni: modulo.sessioni.iter().map(session_row).collect(),
        sessioni_fad,
        sessioni_presenza: modulo.sessioni_presenza.iter().map(session_row).collect(),
        moduli,
        lista_argomenti,
        calendario,
        numbered: numbered_participants(&course.partecipanti),
        session: None,
        participant: None,
        firma_trainer: String::new(),
    }
}

/// `PARTECIPANTE_{i+1}*` keys. Numbering is positional.
pub fn numbered_participants(partecipanti: &[Partecipante]) -> BTreeMap<String, String> {
    let mut keys = BTreeMap::new();
    for (idx, p) in partecipanti.iter().enumerate() {
        let base = format!("PARTECIPANTE_{}", idx + 1);
        let completo = p.nome_completo();
        keys.insert(format!("{}_NOME", base), p.nome.clone());
        keys.insert(format!("{}_COGNOME", base), p.cognome.clone());
        keys.insert(format!("{}_COMPLETO", base), completo.clone());
        keys.insert(format!("{}_CF", base), p.codice_fiscale.clone());
        keys.insert(format!("{}_CODICE_FISCALE", base), p.codice_fiscale.clone());
        keys.insert(format!("{}_EMAIL", base), p.email.clone().unwrap_or_default());
        keys.insert(format!("{}_TELEFONO", base), p.telefono.clone().unwrap_or_default());
        keys.insert(base, completo);
    }
    keys
}

/// Human-readable warnings about a map. They never block generation.
pub fn validate_placeholders(map: &PlaceholderMap) -> Vec<String> {
    let mut warnings = Vec::new();
    if map.scalars.corso_titolo.trim().is_empty() {
        warnings.push("Titolo del corso mancante".to_string());
    }
    if map.scalars.ente_nome.trim().is_empty() {
        warnings.push("Nome dell'ente mancante".to_string());
    }
    if map.partecipanti.is_empty() {
        warnings.push("Nessun partecipante inserito".to_string());
    }
    if map.sessioni.is_empty() {
        warnings.push("Nessuna sessione presente".to_string());
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::course::{Corso, Ente};

    fn partecipante(nome: &str, cognome: &str) -> Partecipante {
        Partecipante {
            nome: nome.to_string(),
            cognome: cognome.to_string(),
            codice_fiscale: format!("{}XXXXXXXXXXXX", &cognome[..3].to_uppercase()),
            ..Default::default()
        }
    }

    fn course() -> CourseData {
        CourseData {
            corso: Corso {
                id: "4521".to_string(),
                titolo: "Sicurezza".to_string(),
                ..Default::default()
            },
            ente: Ente {
                nome: "AKG".to_string(),
                ..Default::default()
            },
            moduli: vec![Modulo {
                titolo: "Base".to_string(),
                argomenti: vec!["Normativa".to_string(), "Rischi".to_string()],
                sessioni: vec![
                    Sessione {
                        numero: 1,
                        data_completa: "10/03/2025".to_string(),
                        ora_inizio: "09:00".to_string(),
                        ora_fine: "18:00".to_string(),
                        is_fad: true,
                        ..Default::default()
                    },
                    Sessione {
                        numero: 2,
                        data_completa: "11/03/2025".to_string(),
                        ora_inizio: "09:00".to_string(),
                        ora_fine: "13:00".to_string(),
                        ..Default::default()
                    },
                ],
                ..Default::default()
            }],
            partecipanti: vec![
                partecipante("Anna", "Verdi"),
                partecipante("Bruno", "Rossi"),
                partecipante("Carla", "Bianchi"),
            ],
            ..Default::default()
        }
        .normalized()
    }

    #[test]
    fn test_numbered_participants_are_positional() {
        let mut data = course();
        let map = map_to_placeholders(&data, 0);
        assert_eq!(map.numbered["PARTECIPANTE_1"], "Anna Verdi");
        assert_eq!(map.numbered["PARTECIPANTE_3"], "Carla Bianchi");
        assert_eq!(map.numbered["PARTECIPANTE_2_COGNOME"], "Rossi");

        data.partecipanti.rotate_right(1);
        let map = map_to_placeholders(&data, 0);
        assert_eq!(map.numbered["PARTECIPANTE_1"], "Carla Bianchi");
        assert_eq!(map.numbered["PARTECIPANTE_2"], "Anna Verdi");
    }

    #[test]
    fn test_hours_split_by_mode() {
        let map = map_to_placeholders(&course(), 0);
        assert_eq!(map.scalars.ore_fad, "8");
        assert_eq!(map.scalars.ore_presenza, "4");
        assert_eq!(map.scalars.numero_pagine, "1");
        assert_eq!(map.scalars.data_vidimazione, "11/03/2025");
    }

    #[test]
    fn test_fad_sessions_embed_connection_times() {
        let map = map_to_placeholders(&course(), 0);
        assert_eq!(map.sessioni_fad.len(), 1);
        let row = &map.sessioni_fad[0];
        assert_eq!(row.sessione.orario, "09:00 - 13:00 / 14:00 - 18:00");
        assert_eq!(row.partecipanti_sessione.len(), 3);
        assert_eq!(row.partecipanti_sessione[2].ora_connessione, "09:00");
        assert_eq!(row.partecipanti_sessione[2].ora_disconnessione, "18:00");
    }

    #[test]
    fn test_value_uses_template_tag_names() {
        let map = map_to_placeholders(&course(), 0).with_participant(&partecipante("Anna", "Verdi"));
        let value = map.to_value();
        assert_eq!(value["CORSO_TITOLO"], "Sicurezza");
        assert_eq!(value["STUDENTI"][0]["NOME_COMPLETO"], "Anna Verdi");
        assert_eq!(value["PARTECIPANTI"][1]["nome"], "Bruno");
        assert_eq!(value["LISTA_ARGOMENTI"][1]["MODULO_TITOLO"], "Base");
        assert_eq!(value["SESSIONI_FAD"][0]["PARTECIPANTI_SESSIONE"][0]["NOME"], "Anna");
        assert_eq!(value["PARTECIPANTE_COGNOME"], "Verdi");
        assert_eq!(value["PARTECIPANTE_1_CF"], "VERXXXXXXXXXXXX");
        assert!(value.get("SESSIONE_DATA").is_none());
    }

    #[test]
    fn test_known_tags() {
        assert!(PlaceholderMap::is_known_tag("CORSO_TITOLO"));
        assert!(PlaceholderMap::is_known_tag("STUDENTI"));
        assert!(PlaceholderMap::is_known_tag("ORA_CONNESSIONE"));
        assert!(PlaceholderMap::is_known_tag("SESSIONE_DATA"));
        assert!(PlaceholderMap::is_known_tag("PARTECIPANTE_12_EMAIL"));
        assert!(PlaceholderMap::is_known_tag("nome_completo"));
        assert!(!PlaceholderMap::is_known_tag("CORSO_INESISTENTE"));
        assert!(!PlaceholderMap::is_known_tag("PARTECIPANTE_X"));
    }

    #[test]
    fn test_validate_placeholders_warns_only() {
        assert!(validate_placeholders(&map_to_placeholders(&course(), 0)).is_empty());

        let warnings = validate_placeholders(&map_to_placeholders(&CourseData::default(), 0));
        assert_eq!(warnings.len(), 4);
    }
}
