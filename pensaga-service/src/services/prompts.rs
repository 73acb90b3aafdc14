//! Prompt templates for the text-generation endpoints.
//!
//! Templates use `{name}` placeholders. Rendering is a single left-to-right
//! pass: substituted values are never re-scanned, so caller text containing
//! `{pitch}` or stray braces comes out verbatim.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PromptError {
    #[error("no value for placeholder `{0}` in template {1}")]
    MissingValue(&'static str, &'static str),

    #[error("template {1} has no placeholder `{0}`")]
    UnknownPlaceholder(String, &'static str),
}

#[derive(Debug, Clone, Copy)]
pub struct PromptTemplate {
    pub name: &'static str,
    text: &'static str,
    placeholders: &'static [&'static str],
}

impl PromptTemplate {
    pub fn placeholders(&self) -> &'static [&'static str] {
        self.placeholders
    }

    /// Substitute every placeholder. All of them must be supplied.
    pub fn render(&self, values: &[(&str, &str)]) -> Result<String, PromptError> {
        if let Some((key, _)) = values
            .iter()
            .find(|(key, _)| !self.placeholders.contains(key))
        {
            return Err(PromptError::UnknownPlaceholder(key.to_string(), self.name));
        }
        for placeholder in self.placeholders {
            if !values.iter().any(|(key, _)| key == placeholder) {
                return Err(PromptError::MissingValue(placeholder, self.name));
            }
        }

        let mut out = String::with_capacity(
            self.text.len() + values.iter().map(|(_, v)| v.len()).sum::<usize>(),
        );
        let mut rest = self.text;
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let tail = &rest[open + 1..];
            let substituted = tail.find('}').and_then(|close| {
                let key = &tail[..close];
                values
                    .iter()
                    .find(|(k, _)| *k == key)
                    .map(|(_, value)| (close, *value))
            });
            match substituted {
                Some((close, value)) => {
                    out.push_str(value);
                    rest = &tail[close + 1..];
                }
                None => {
                    out.push('{');
                    rest = tail;
                }
            }
        }
        out.push_str(rest);

        Ok(out)
    }
}

pub const CREATE_PITCH: PromptTemplate = PromptTemplate {
    name: "CREATE_PITCH",
    placeholders: &["user_request"],
    text: r#"
Tu es un créateur de webnovels expert en narration courte et percutante.
Ta mission est de générer **5 idées de pitchs originaux**, cohérents et inspirants à partir de la demande suivante :
"{user_request}"

⚙️ Contraintes :
- Réponds **uniquement en français**.
- Chaque pitch doit faire **exactement 2 lignes complètes**.
- Les pitchs doivent être **cohérents, sans anachronismes ni contradictions logiques**.
- Aucun pitch ne doit contenir d'éléments extérieurs non mentionnés dans la demande.
- Style immersif, adapté à un univers de webnovel (dramatique, visuel, dynamique).
- N'inclus **aucune énumération, balise, numérotation ou commentaire** : uniquement les 5 pitchs séparés par une ligne vide.
- Le rendu final doit être **du texte pur uniquement**, sans formatage Markdown, sans puces, sans balises.
"#,
};

pub const CREATE_SYNOPSIS: PromptTemplate = PromptTemplate {
    name: "CREATE_SYNOPSIS",
    placeholders: &["user_request"],
    text: r#"
Tu es un scénariste professionnel spécialisé en webnovels narratifs.
À partir du pitch suivant :
"{user_request}"

Rédige un **synopsis complet de 10 lignes** exactement.

⚙️ Contraintes :
- Réponds **uniquement en français**.
- Le texte doit être narratif et cohérent avec le pitch.
- Décris clairement le contexte, les enjeux, les principaux personnages et la tonalité de l'histoire.
- Le style doit être immersif et visuel (comme une bande-annonce écrite).
- Aucun ajout d'éléments non logiques par rapport au pitch.
- Ne pas inventer d'univers supplémentaires.
- Le rendu final doit être **uniquement du texte**, sans titre, sans numéro, sans balise, sans marqueur de ligne.
"#,
};

pub const CREATE_CHARACTERS: PromptTemplate = PromptTemplate {
    name: "CREATE_CHARACTERS",
    placeholders: &["pitch", "synopsis"],
    text: r#"
Tu es un character designer narratif expert en création de personnages pour webnovel.
À partir des éléments suivants :

Pitch : {pitch}
Synopsis : {synopsis}

Génère la description des **3 à 5 personnages principaux** du webnovel.

⚙️ Contraintes :
- Réponds **uniquement en français**.
- Tu dois retourner **uniquement du JSON valide** (sans texte supplémentaire avant ou après).
- Le format JSON doit être un tableau d'objets avec exactement cette structure :
[
  {
    "nom": "Nom complet du personnage",
    "âge": "Âge ou tranche d'âge",
    "apparence": "Description physique détaillée mais concise",
    "personnalité": "Description de la personnalité",
    "rôle": "Rôle et importance dans l'histoire"
  }
]

- Chaque personnage doit avoir ces 5 champs obligatoires : nom, âge, apparence, personnalité, rôle
- Chaque champ doit être une chaîne de caractères en français
- Chaque description de personnage doit être en **100 mots maximum par champ**
- Les descriptions doivent être cohérentes entre elles et avec le synopsis
- Génère entre 3 et 5 personnages selon l'histoire
- **Réponds SEULEMENT avec le JSON, sans aucun texte avant ou après**
"#,
};

pub const CREATE_EPISODE: PromptTemplate = PromptTemplate {
    name: "CREATE_EPISODE",
    placeholders: &["numero", "pitch", "synopsis", "personnages", "contexte_episodes"],
    text: r#"
Tu es un romancier professionnel. Rédige l'épisode {numero} de cette histoire de manière claire, captivante et lisible.

À partir des informations suivantes :

Pitch : {pitch}
Synopsis : {synopsis}
Personnages : {personnages}
{contexte_episodes}

📖 RÈGLES D'ÉCRITURE IMPÉRATIVES :

**1. CLARTÉ AVANT TOUT**
- Phrases **courtes et compréhensibles**. Évite les phrases à rallonge.
- Descriptions **concrètes et précises**. Pas de métaphores vagues.
- Actions **claires et faciles à visualiser**.
- Ne jamais sacrifier la clarté pour le style.

**2. NARRATION EFFICACE**
- **Montre, ne décris pas** : privilégie l'action aux descriptions atmosphériques.
- Alterne **dialogue** et **action** de manière équilibrée.
- Chaque paragraphe doit **faire avancer l'histoire**.
- Pas de longues descriptions de décor : l'essentiel uniquement.

**3. DIALOGUES NATURELS**
- Utilise des guillemets français « » pour les dialogues.
- Les personnages parlent **naturellement**, comme des vraies personnes.
- Évite les dialogues artificiels ou poétiques.
- Les dialogues révèlent la personnalité et font progresser l'intrigue.

**4. INTERDICTIONS STRICTES**
- ❌ PAS de métaphores alambiquées ("la lumière danse", "l'ombre murmure", "le silence s'épaissit").
- ❌ PAS de répétitions (lumière, ombre, silence, brume, éclat, lueur).
- ❌ PAS de phrases confuses ou poétiques qui ralentissent la lecture.
- ❌ PAS de descriptions vagues ("une présence sinistre", "une aura sombre").
- ❌ PAS d'incohérences (genre des personnages, détails contradictoires).

**5. STRUCTURE**
- Longueur : **entre 1500 et 2500 mots**.
- **Début percutant** : entre directement dans l'action ou un moment fort.
- **Milieu dynamique** : événements significatifs, tensions, révélations.
- **Fin marquante** : arrête sur un moment intense (danger, révélation, choix difficile, disparition).

**6. COHÉRENCE**
- Respecte **scrupuleusement** les épisodes précédents.
- Utilise **uniquement** les personnages listés.
- Garde la même tonalité et le même niveau de langue.

**7. FORMAT**
- Texte narratif **pur et continu**.
- Pas de titre, pas de numéro, pas de balises.
- Réponds **uniquement en français**.

🎯 OBJECTIF : Un texte fluide et captivant qu'on lit d'une traite, avec une vraie progression narrative et des personnages vivants.
"#,
};

pub const FIX_TEXT: PromptTemplate = PromptTemplate {
    name: "FIX_TEXT",
    placeholders: &["text"],
    text: r#"
Tu es un correcteur de texte expert.
Corrige uniquement les fautes d'orthographe, de grammaire et de typographie dans le texte suivant :
"{text}"

⚙️ Contraintes :
- Réponds **uniquement en français**.
- Ne reformule rien.
- Ne modifie ni la ponctuation volontaire, ni le style, ni les tournures.
- Ne supprime ni ajoute aucun mot.
- Le rendu final doit être **le texte corrigé uniquement**, sans explication ni commentaire.
"#,
};

pub const REPHRASE_TEXT: PromptTemplate = PromptTemplate {
    name: "REPHRASE_TEXT",
    placeholders: &["text_complete", "text_to_reformulate"],
    text: r#"
Voici un texte complet :
"{text_complete}"

Voici un passage à reformuler :
"{text_to_reformulate}"

Réécris uniquement ce passage pour qu'il soit mieux formulé, plus fluide et naturel, tout en restant cohérent avec le reste du texte complet.

⚙️ Contraintes :
- Réponds **uniquement en français**.
- Le sens global du passage doit être conservé.
- Aucune information nouvelle ne doit être ajoutée.
- Aucune ponctuation volontaire ne doit être modifiée.
- Le rendu final doit être **le texte reformulé uniquement**, sans explication ni commentaire.
"#,
};

/// Every template, in endpoint order.
pub const ALL_TEMPLATES: [PromptTemplate; 6] = [
    CREATE_PITCH,
    CREATE_SYNOPSIS,
    CREATE_CHARACTERS,
    CREATE_EPISODE,
    FIX_TEXT,
    REPHRASE_TEXT,
];

/// Context block listing previous episodes; empty when there are none.
pub fn episode_context(previous: &[String]) -> String {
    if previous.is_empty() {
        return String::new();
    }

    let joined = previous
        .iter()
        .enumerate()
        .map(|(i, episode)| format!("Épisode {} :\n{}", i + 1, episode))
        .collect::<Vec<_>>()
        .join("\n\n---\n\n");

    format!(
        "Épisodes précédents (pour contexte et cohérence) :\n{}\n",
        joined
    )
}
